//! Read(er) side of the crate: one contract, three access strategies.
//!
//! | reader | source | `has`/`get` | memory |
//! |---|---|---|---|
//! | [DecodedReader] | buffer, stream or file, fully decoded | yes | whole archive |
//! | [StreamingReader] | any [std::io::Read] | no, iterate with [CarRead::entries] | one frame |
//! | [IndexedReader] | file, indexed in one pass | yes, seek + read | the index |
//!
//! Every reader is read-only: it also implements [CarWrite], declining each mutation
//! with [CarError::Unsupported].

use crate::error::{CarError, Result};
use crate::wire::RawCid;

pub use decoded::DecodedReader;
pub use indexed::IndexedReader;
pub use streaming::StreamingReader;

mod decoded;
mod indexed;
mod streaming;

/// One item produced by [CarRead::entries]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: RawCid,
    /// Block payload, `None` when iterating keys only
    pub value: Option<Vec<u8>>,
}

impl Entry {
    fn new(key: RawCid, value: Vec<u8>, keys_only: bool) -> Self {
        Entry {
            key,
            value: (!keys_only).then_some(value),
        }
    }
}

/// Lazy sequence of entries, see [CarRead::entries]
pub type Entries<'a> = Box<dyn Iterator<Item = Result<Entry>> + 'a>;

/// Read contract shared by all CAR readers
///
/// Operations a reader cannot support fail with [CarError::Unsupported], operations on a
/// closed reader fail with [CarError::Closed], and keys that are not structurally valid CIDs
/// are rejected with [CarError::InvalidKey] before any lookup.
pub trait CarRead {
    /// Is a block stored under `key`?
    fn has(&self, key: &RawCid) -> Result<bool>;

    /// Payload stored under `key`, [CarError::NotFound] if absent
    fn get(&mut self, key: &RawCid) -> Result<Vec<u8>>;

    /// Root CIDs from the archive header
    fn roots(&mut self) -> Result<&[RawCid]>;

    /// Lazy sequence of the blocks in archive order, with or without their payloads
    fn entries(&mut self, keys_only: bool) -> Result<Entries<'_>>;

    /// Releases any resource held by the reader, idempotent
    fn close(&mut self) -> Result<()>;
}

/// Write contract of a CAR store
///
/// The default methods decline the operation, which is what read-only stores want.
pub trait CarWrite {
    /// Fixes the root CIDs of the archive
    fn set_roots(&mut self, _roots: Vec<RawCid>) -> Result<()> {
        Err(CarError::Unsupported("set_roots on a read-only CAR store"))
    }

    /// Appends a block to the archive
    fn put(&mut self, _key: &RawCid, _value: &[u8]) -> Result<()> {
        Err(CarError::Unsupported("put on a read-only CAR store"))
    }

    /// CAR archives are append-only, deleting is never supported
    fn delete(&mut self, _key: &RawCid) -> Result<()> {
        Err(CarError::Unsupported("delete on an append-only CAR archive"))
    }

    /// Flushes and releases the sink, idempotent
    fn close(&mut self) -> Result<()>;
}
