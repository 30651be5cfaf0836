//! Reading and writing of the protobuf traces produced by simpleperf's
//! `report_sample.py --protobuf`

#![deny(missing_docs)]

pub mod proto;
mod reader;
mod record;
mod writer;

// Reexport types which appear in the public interface
pub use self::{
    proto::{
        record::RecordData, sample::CallChainEntry, File, LostSituation, MetaInfo, Record, Sample,
        Thread,
    },
    reader::{FormatError, RawRecord, ReadError, TraceReader, HEADER_LEN, MAGIC},
    record::{
        is_main_thread, same_frame, sample_record, sample_thread_id, RecordKind, ThreadId,
        INVALID_SYMBOL_ID,
    },
    writer::{TraceWriter, WriteError},
};
