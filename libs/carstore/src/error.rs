use std::io;

use crate::wire::cid::{CidFormatError, RawCid};

pub type Result<T> = std::result::Result<T, CarError>;

/// Errors returned by the CAR readers and writers
#[derive(thiserror::Error, Debug)]
pub enum CarError {
    /// The source ended in the middle of a frame (or of a length prefix)
    #[error("Unexpected end of file")]
    UnexpectedEof,
    #[error("Invalid header format: {0}")]
    InvalidHeader(#[from] ciborium::de::Error<io::Error>),
    #[error("Invalid CAR version, expected 1, got {0}")]
    InvalidVersion(u64),
    /// A frame is structurally invalid (zero length, bad CID, CID overrunning the frame...)
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
    #[error("Failed to encode CAR header: {0}")]
    Serialization(#[from] ciborium::ser::Error<io::Error>),
    #[error("CID not found: {0}")]
    NotFound(RawCid),
    /// The key is not a structurally valid CID
    #[error("Invalid key: {0}")]
    InvalidKey(#[from] CidFormatError),
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),
    #[error("Protocol violation: {0}")]
    ProtocolViolation(&'static str),
    #[error("Operation on a closed CAR store")]
    Closed,
    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for CarError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            CarError::UnexpectedEof
        } else {
            CarError::Io(e)
        }
    }
}

impl CarError {
    /// Is this error a truncation of the archive?
    pub fn is_truncation(&self) -> bool {
        matches!(self, CarError::UnexpectedEof)
    }

    /// Is this error a lookup miss?
    pub fn is_not_found(&self) -> bool {
        matches!(self, CarError::NotFound(_))
    }
}
