//! Error types for the compression engine.
//!
//! Every error is terminal for the stream being processed. There is no partial-data
//! recovery: the caller discards whatever was written and starts over from another source.

use std::fmt::{Display, Formatter};
use std::io;

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Which checksum failed to verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcScope {
    /// The CRC stored in the header of the given block (numbered from 1).
    Block(u64),
    /// The combined CRC stored after the end-of-stream magic.
    Stream,
}

impl Display for CrcScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CrcScope::Block(seq) => write!(f, "block {}", seq),
            CrcScope::Stream => write!(f, "stream"),
        }
    }
}

/// Engine error taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    /// The bit reader ran out of input in the middle of a stream.
    #[error("truncated stream: unexpected end of input")]
    TruncatedStream,

    /// A magic number, header field or coded value is not valid for the format.
    #[error("corrupt stream: {reason}")]
    CorruptStream { reason: String },

    /// A block or stream CRC did not match the data that was decoded.
    #[error("checksum mismatch in {scope}: stored 0x{expected:08x}, computed 0x{actual:08x}")]
    ChecksumMismatch {
        scope: CrcScope,
        expected: u32,
        actual: u32,
    },

    /// A caller supplied option is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The block assembler would have exceeded the block capacity.
    #[error("block overflow: {len} bytes exceeds capacity of {capacity}")]
    BlockOverflow { len: usize, capacity: usize },

    /// A block declared a Huffman table count outside 2..=6.
    #[error("invalid Huffman table count {0} (expected 2 to 6)")]
    InvalidTableCount(usize),

    /// A Huffman code length is outside 1..=20.
    #[error("code length {length} for symbol {symbol} in table {table} is outside 1..=20")]
    CodeLengthOverflow {
        table: usize,
        symbol: usize,
        length: i32,
    },

    /// A selector names a table that does not exist.
    #[error("selector {selector} out of range for {tables} tables")]
    SelectorOutOfRange { selector: usize, tables: usize },

    /// I/O error from the underlying reader or writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create a corrupt stream error.
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Error::CorruptStream {
            reason: reason.into(),
        }
    }

    /// True for errors caused by malformed compressed input. Anything else raised while
    /// compressing (other than I/O) points at a bug in the engine itself.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Error::TruncatedStream
                | Error::CorruptStream { .. }
                | Error::ChecksumMismatch { .. }
                | Error::InvalidTableCount(_)
                | Error::CodeLengthOverflow { .. }
                | Error::SelectorOutOfRange { .. }
        )
    }

    /// Short name of the error kind, used in log lines.
    pub fn category(&self) -> &'static str {
        match self {
            Error::TruncatedStream => "truncated_stream",
            Error::CorruptStream { .. } => "corrupt_stream",
            Error::ChecksumMismatch { .. } => "checksum_mismatch",
            Error::InvalidConfiguration(_) => "invalid_configuration",
            Error::BlockOverflow { .. } => "block_overflow",
            Error::InvalidTableCount(_) => "invalid_table_count",
            Error::CodeLengthOverflow { .. } => "code_length_overflow",
            Error::SelectorOutOfRange { .. } => "selector_out_of_range",
            Error::Io(_) => "io_error",
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err {
            Error::Io(e) => e,
            Error::TruncatedStream => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            Error::InvalidConfiguration(_) => io::Error::new(io::ErrorKind::InvalidInput, err),
            Error::BlockOverflow { .. } => io::Error::new(io::ErrorKind::Other, err),
            _ => io::Error::new(io::ErrorKind::InvalidData, err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn data_error_test() {
        assert!(Error::TruncatedStream.is_data_error());
        assert!(Error::corrupt("bad magic").is_data_error());
        assert!(!Error::BlockOverflow {
            len: 10,
            capacity: 9
        }
        .is_data_error());
        assert!(!Error::InvalidConfiguration("block size 0".into()).is_data_error());
    }

    #[test]
    fn io_conversion_test() {
        let e: io::Error = Error::TruncatedStream.into();
        assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof);
        let e: io::Error = Error::InvalidTableCount(7).into();
        assert_eq!(e.kind(), io::ErrorKind::InvalidData);
        let e: io::Error = Error::Io(io::Error::new(io::ErrorKind::BrokenPipe, "x")).into();
        assert_eq!(e.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn display_test() {
        let e = Error::ChecksumMismatch {
            scope: CrcScope::Block(3),
            expected: 0xdeadbeef,
            actual: 1,
        };
        assert_eq!(
            e.to_string(),
            "checksum mismatch in block 3: stored 0xdeadbeef, computed 0x00000001"
        );
    }
}
