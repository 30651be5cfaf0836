//! Decoding of the length-prefixed record stream

use crate::proto::Record;
use prost::Message;
use thiserror::Error;

/// Magic string at the very beginning of a simpleperf trace
pub const MAGIC: &[u8; 10] = b"SIMPLEPERF";

/// Size of the file header (magic + version)
pub const HEADER_LEN: usize = MAGIC.len() + 2;

/// Record as it was read from the trace
#[derive(Clone, Debug, PartialEq)]
pub struct RawRecord<'buf> {
    /// Offset of the record's length prefix in the trace
    pub offset: usize,

    /// Original encoded bytes, without the length prefix
    pub bytes: &'buf [u8],

    /// Decoded record
    pub record: Record,
}

/// Reader of a fully loaded simpleperf trace
///
/// The trace format is...
///
/// ```text
/// char magic[10] = "SIMPLEPERF";
/// LittleEndian16(version);
/// LittleEndian32(record_size_0)
/// Record (record_size_0 bytes)
/// ...
/// LittleEndian32(record_size_N)
/// Record (record_size_N bytes)
/// LittleEndian32(0)
/// ```
///
/// ...and iterating over this reader yields the records in file order, up to
/// the zero-length terminator. Reading again means building a new reader over
/// the same buffer.
///
#[derive(Clone, Debug)]
pub struct TraceReader<'buf> {
    /// Whole trace
    buffer: &'buf [u8],

    /// Format version from the header
    version: u16,

    /// Offset of the next length prefix
    cursor: usize,

    /// Truth that the terminator or an error was encountered
    done: bool,
}
//
impl<'buf> TraceReader<'buf> {
    /// Check the trace header and get ready to read records
    pub fn new(buffer: &'buf [u8]) -> Result<Self, FormatError> {
        let magic = buffer
            .get(..MAGIC.len())
            .ok_or(FormatError::TruncatedHeader(buffer.len()))?;
        if magic != MAGIC {
            return Err(FormatError::BadMagic(magic.into()));
        }
        let version = buffer
            .get(MAGIC.len()..HEADER_LEN)
            .ok_or(FormatError::TruncatedHeader(buffer.len()))?;
        let version = u16::from_le_bytes([version[0], version[1]]);
        log::debug!(
            "Reading simpleperf trace v{version} ({} bytes)",
            buffer.len()
        );
        Ok(Self {
            buffer,
            version,
            cursor: HEADER_LEN,
            done: false,
        })
    }

    /// Trace format version
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Read the next record, if any
    fn read_record(&mut self) -> Result<Option<RawRecord<'buf>>, ReadError> {
        let offset = self.cursor;
        let length_end = offset + 4;
        let length = self
            .buffer
            .get(offset..length_end)
            .ok_or(FormatError::TruncatedLength(offset))?;
        let length = u32::from_le_bytes([length[0], length[1], length[2], length[3]]);
        if length == 0 {
            return Ok(None);
        }

        let bytes = usize::try_from(length)
            .ok()
            .and_then(|length| self.buffer.get(length_end..length_end.checked_add(length)?))
            .ok_or(FormatError::RecordOverrun {
                offset,
                length,
                remaining: self.buffer.len() - length_end,
            })?;
        let record = Record::decode(bytes)
            .map_err(|source| ReadError::Codec { offset, source })?;
        self.cursor = length_end + bytes.len();
        Ok(Some(RawRecord {
            offset,
            bytes,
            record,
        }))
    }
}
//
impl<'buf> Iterator for TraceReader<'buf> {
    type Item = Result<RawRecord<'buf>, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.read_record();
        if !matches!(result, Ok(Some(_))) {
            self.done = true;
        }
        result.transpose()
    }
}
//
impl std::iter::FusedIterator for TraceReader<'_> {}

/// The trace does not follow the simpleperf framing
#[derive(Clone, Debug, Error, PartialEq)]
pub enum FormatError {
    /// File is too short to hold the magic string and version
    #[error("trace is too short ({0} bytes) to hold a simpleperf header")]
    TruncatedHeader(usize),

    /// File does not start with the expected magic string
    #[error("simpleperf trace could not be parsed due to magic number mismatch (found {0:?})")]
    BadMagic(Box<[u8]>),

    /// File ended where a record length was expected
    #[error("trace ended at offset {0} without a zero-length terminator")]
    TruncatedLength(usize),

    /// Record length goes past the end of the file
    #[error("record at offset {offset} claims {length} bytes, but only {remaining} remain")]
    RecordOverrun {
        /// Offset of the record's length prefix
        offset: usize,
        /// Announced record length
        length: u32,
        /// Bytes remaining after the length prefix
        remaining: usize,
    },
}

/// What can go wrong while reading records
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ReadError {
    /// Broken framing
    #[error(transparent)]
    Format(#[from] FormatError),

    /// A record could not be decoded
    #[error("failed to decode record at offset {offset}")]
    Codec {
        /// Offset of the record's length prefix
        offset: usize,
        /// Protobuf decoding error
        #[source]
        source: prost::DecodeError,
    },
}
