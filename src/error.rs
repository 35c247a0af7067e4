//! Error types

use crate::binary::read::ReadEof;
use std::fmt;

/// Errors that originate when decoding binary data
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum DecodeError {
    /// A read would have gone past the end of the supplied data.
    BufferBounds,
    /// A format field held a value outside the defined set.
    UnknownFormat(u16),
    /// A lookup type with no registered decoder.
    UnknownLookupType(u16),
    /// A count field contradicts the structure it describes.
    InconsistentCount,
    BadValue,
    BadVersion,
    BadOffset,
    BadIndex,
    LimitExceeded,
    /// A failure while decoding the lookup at `index` in the lookup list.
    Lookup {
        index: usize,
        error: Box<DecodeError>,
    },
}

impl DecodeError {
    /// The underlying error, looking through any `Lookup` wrapper.
    pub fn root_cause(&self) -> &DecodeError {
        match self {
            DecodeError::Lookup { error, .. } => error.root_cause(),
            err => err,
        }
    }
}

impl From<ReadEof> for DecodeError {
    fn from(_error: ReadEof) -> Self {
        DecodeError::BufferBounds
    }
}

impl From<std::num::TryFromIntError> for DecodeError {
    fn from(_error: std::num::TryFromIntError) -> Self {
        DecodeError::BadValue
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::BufferBounds => write!(f, "end of data reached unexpectedly"),
            DecodeError::UnknownFormat(format) => write!(f, "unknown format {}", format),
            DecodeError::UnknownLookupType(lookup_type) => {
                write!(f, "unsupported lookup type {}", lookup_type)
            }
            DecodeError::InconsistentCount => write!(f, "count inconsistent with table data"),
            DecodeError::BadValue => write!(f, "invalid value"),
            DecodeError::BadVersion => write!(f, "unexpected data version"),
            DecodeError::BadOffset => write!(f, "invalid data offset"),
            DecodeError::BadIndex => write!(f, "invalid data index"),
            DecodeError::LimitExceeded => write!(f, "limit exceeded"),
            DecodeError::Lookup { index, error } => write!(f, "lookup {}: {}", index, error),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Errors that originate when writing binary data
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum WriteError {
    BadValue,
    PlaceholderMismatch,
}

impl From<std::num::TryFromIntError> for WriteError {
    fn from(_error: std::num::TryFromIntError) -> Self {
        WriteError::BadValue
    }
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::BadValue => write!(f, "write: bad value"),
            WriteError::PlaceholderMismatch => {
                write!(f, "data written to placeholder did not match expected size")
            }
        }
    }
}

impl std::error::Error for WriteError {}
