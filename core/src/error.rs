//! Error taxonomy shared by the engine and the searcher.
//!
//! Construction failures surface as [`InitError`], image decoding failures as
//! one of the four [`DeserializeError`] kinds, and id lookups as
//! [`LookupError`].

use std::io;

use thiserror::Error;

/// Failure to build an engine or searcher from a phonetic-table source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to initialize from {origin}: {reason}")]
pub struct InitError {
    /// Path or description of the source that was being read.
    pub origin: String,
    pub reason: String,
}

impl InitError {
    pub fn new(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            reason: reason.into(),
        }
    }
}

/// Failure to restore an engine or searcher image.
#[derive(Debug, Error)]
pub enum DeserializeError {
    /// The file (or stream) could not be opened or read.
    #[error("file not successfully opened: {target}")]
    FileNotOpen {
        target: String,
        #[source]
        source: io::Error,
    },

    /// The leading tag does not belong to this image kind or format revision.
    #[error("invalid binary version: expected {expected:#010x}, found {found:#010x}")]
    BinaryVersionInvalid { expected: u32, found: u32 },

    /// Truncated image, malformed field or dangling index.
    #[error("image data out of range: {0}")]
    OutOfRange(String),

    /// Reconstruction needed more memory than could be obtained.
    #[error("bad allocation while reconstructing image")]
    BadAlloc,
}

impl DeserializeError {
    pub fn file_not_open(target: impl Into<String>, source: io::Error) -> Self {
        DeserializeError::FileNotOpen {
            target: target.into(),
            source,
        }
    }

    pub fn out_of_range(detail: impl Into<String>) -> Self {
        DeserializeError::OutOfRange(detail.into())
    }

    /// Short name of the failure kind, stable across messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DeserializeError::FileNotOpen { .. } => "FileNotOpen",
            DeserializeError::BinaryVersionInvalid { .. } => "BinaryVersionInvalid",
            DeserializeError::OutOfRange(_) => "OutOfRange",
            DeserializeError::BadAlloc => "BadAlloc",
        }
    }
}

impl From<bincode::Error> for DeserializeError {
    fn from(err: bincode::Error) -> Self {
        match *err {
            bincode::ErrorKind::SizeLimit => DeserializeError::BadAlloc,
            bincode::ErrorKind::Io(io_err) => match io_err.kind() {
                io::ErrorKind::UnexpectedEof => {
                    DeserializeError::out_of_range("unexpected end of image")
                }
                io::ErrorKind::OutOfMemory => DeserializeError::BadAlloc,
                _ => DeserializeError::file_not_open("stream", io_err),
            },
            other => DeserializeError::OutOfRange(other.to_string()),
        }
    }
}

/// Failure to resolve an id against a searcher's string pool.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("unknown id {id} (pool holds {len} strings)")]
    UnknownId { id: usize, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_limit_maps_to_bad_alloc() {
        let err: DeserializeError = Box::new(bincode::ErrorKind::SizeLimit).into();
        assert!(matches!(err, DeserializeError::BadAlloc));
    }

    #[test]
    fn eof_maps_to_out_of_range() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        let err: DeserializeError = Box::new(bincode::ErrorKind::Io(io_err)).into();
        assert_eq!(err.kind_name(), "OutOfRange");
    }

    #[test]
    fn malformed_fields_map_to_out_of_range() {
        let err: DeserializeError = Box::new(bincode::ErrorKind::InvalidCharEncoding).into();
        assert!(matches!(err, DeserializeError::OutOfRange(_)));
    }

    #[test]
    fn messages_name_the_failure() {
        let err = LookupError::UnknownId { id: 7, len: 3 };
        assert_eq!(err.to_string(), "unknown id 7 (pool holds 3 strings)");

        let err = InitError::new("table.txt", "line 3: bad reading");
        assert!(err.to_string().contains("table.txt"));
    }
}
