//! Low-level access to the CAR v1 wire format.
//!
//! ```text
//! archive      := header-frame block-frame*
//! header-frame := varint(len) cbor({roots: [CID], version: 1})
//! block-frame  := varint(len) cid-bytes payload-bytes
//! ```

pub mod block;
pub mod cid;
pub mod frame;
pub mod header;
pub mod varint;

pub use block::{Block, BlockLocation};
pub use cid::{CidFormatError, RawCid};
pub use header::CarHeader;
