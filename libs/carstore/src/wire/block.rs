use std::io::Write;

use crate::error::{CarError, Result};
use crate::wire::cid::{CidFormatError, RawCid};
use crate::wire::frame;

/// A Block is one record of a CAR archive: a CID and the opaque payload it identifies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// CID of the block
    cid: RawCid,
    /// Payload of the block
    data: Vec<u8>,
}

/// A BlockLocation gives where the payload of a block lives in a CAR file,
/// without the payload itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockLocation {
    /// Offset of the first payload byte in the CAR file
    pub offset: u64,
    /// Length of the payload in bytes (CID and length prefix excluded)
    pub length: u64,
}

impl Block {
    /// Creates a new Block
    pub fn new(cid: RawCid, data: Vec<u8>) -> Self {
        Block { cid, data }
    }

    /// Returns the CID of the block
    pub fn cid(&self) -> &RawCid {
        &self.cid
    }

    /// Returns the payload of the block
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Splits the block into its CID and payload
    pub fn into_parts(self) -> (RawCid, Vec<u8>) {
        (self.cid, self.data)
    }

    /// Length of the frame body (CID + payload), i.e. the value of the length prefix
    pub fn body_length(&self) -> u64 {
        (self.cid.bytes().len() + self.data.len()) as u64
    }

    /// Decodes a Block from a frame body (`<cid><payload>`)
    pub fn from_frame_body(mut body: Vec<u8>) -> Result<Self> {
        let (cid, cid_size) = match RawCid::try_read_bytes(&body) {
            Ok(read) => read,
            Err(CidFormatError::InsufficientData) => {
                return Err(CarError::InvalidFrame(
                    "CID overruns the frame body".to_owned(),
                ));
            }
            Err(e) => return Err(CarError::InvalidFrame(e.to_string())),
        };
        let data = body.split_off(cid_size);
        Ok(Block::new(cid, data))
    }

    /// Writes the block as one frame and flushes the sink
    ///
    /// Returns the total number of bytes written, length prefix included.
    pub fn write_frame<W: Write + ?Sized>(&self, sink: &mut W) -> Result<u64> {
        frame::write_frame(sink, &[self.cid.bytes(), &self.data])
    }
}
