//! Encoding of the length-prefixed record stream

use crate::{proto::Record, reader::MAGIC};
use prost::Message;
use std::io::{self, Write};
use thiserror::Error;

/// Writer of a simpleperf trace
///
/// Records are emitted in the order in which they are submitted. The trace is
/// only complete once `finish()` has written the terminator.
///
#[derive(Debug)]
pub struct TraceWriter<W: Write> {
    /// Destination of the trace
    output: W,

    /// Number of records written so far
    num_records: usize,
}
//
impl<W: Write> TraceWriter<W> {
    /// Start a trace by writing its header
    pub fn new(mut output: W, version: u16) -> Result<Self, WriteError> {
        output.write_all(MAGIC)?;
        output.write_all(&version.to_le_bytes())?;
        Ok(Self {
            output,
            num_records: 0,
        })
    }

    /// Copy an already encoded record
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<(), WriteError> {
        let length = u32::try_from(bytes.len())
            .ok()
            .filter(|&length| length != 0)
            .ok_or(WriteError::BadRecordSize(bytes.len()))?;
        self.output.write_all(&length.to_le_bytes())?;
        self.output.write_all(bytes)?;
        self.num_records += 1;
        Ok(())
    }

    /// Encode and write a record
    pub fn write_record(&mut self, record: &Record) -> Result<(), WriteError> {
        self.write_raw(&record.encode_to_vec())
    }

    /// Number of records written so far
    pub fn num_records(&self) -> usize {
        self.num_records
    }

    /// Terminate the trace and hand back the destination
    pub fn finish(mut self) -> Result<W, WriteError> {
        self.output.write_all(&0u32.to_le_bytes())?;
        self.output.flush()?;
        Ok(self.output)
    }
}

/// What can go wrong while writing a trace
#[derive(Debug, Error)]
pub enum WriteError {
    /// Encoded record cannot be framed
    ///
    /// Zero is reserved for the terminator, and the length prefix is 32-bit.
    ///
    #[error("cannot frame a record of {0} bytes")]
    BadRecordSize(usize),

    /// Failed to write to the destination
    #[error("failed to write trace data")]
    Io(#[from] io::Error),
}
