//! Convenience layer on top of the raw protobuf records

use crate::proto::{
    record::RecordData, sample::CallChainEntry, File, LostSituation, MetaInfo, Record, Sample,
    Thread,
};

/// Value of `CallChainEntry::symbol_id` when the symbol could not be resolved
pub const INVALID_SYMBOL_ID: i32 = -1;

/// Kernel thread identifier
pub type ThreadId = u32;

/// Borrowed view of a record's payload
///
/// Only samples and threads matter for stack repair, everything else is
/// carried around as-is.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RecordKind<'record> {
    /// Stack sample
    Sample(&'record Sample),

    /// Thread description
    Thread(&'record Thread),

    /// Binary or library
    File(&'record File),

    /// Lost sample statistics
    Lost(&'record LostSituation),

    /// Recording metadata
    MetaInfo(&'record MetaInfo),

    /// Context switches and payloads unknown to this version of the schema
    Other,
}
//
impl<'record> RecordKind<'record> {
    /// Classify a record
    pub fn of(record: &'record Record) -> Self {
        match &record.record_data {
            Some(RecordData::Sample(sample)) => Self::Sample(sample),
            Some(RecordData::Thread(thread)) => Self::Thread(thread),
            Some(RecordData::File(file)) => Self::File(file),
            Some(RecordData::Lost(lost)) => Self::Lost(lost),
            Some(RecordData::MetaInfo(meta_info)) => Self::MetaInfo(meta_info),
            Some(RecordData::ContextSwitch(_)) | None => Self::Other,
        }
    }
}

/// Wrap a sample into a record
pub fn sample_record(sample: Sample) -> Record {
    Record {
        record_data: Some(RecordData::Sample(sample)),
    }
}

/// Thread that a sample was taken from
//
// Samples store the kernel tid as a signed integer while Thread records store
// it as an unsigned one. The bits are the same.
pub fn sample_thread_id(sample: &Sample) -> ThreadId {
    sample.thread_id() as ThreadId
}

/// Truth that a thread is the main thread of its process
pub fn is_main_thread(thread: &Thread) -> bool {
    thread.thread_id() == thread.process_id()
}

/// Truth that two call chain entries designate the same frame
///
/// Entries match if they come from the same file and symbol. When the symbol
/// could not be resolved, the virtual address must also match.
///
pub fn same_frame(e1: &CallChainEntry, e2: &CallChainEntry) -> bool {
    if e1.file_id() != e2.file_id() || e1.symbol_id() != e2.symbol_id() {
        return false;
    }
    if e1.symbol_id() == INVALID_SYMBOL_ID {
        e1.vaddr_in_file() == e2.vaddr_in_file()
    } else {
        true
    }
}
