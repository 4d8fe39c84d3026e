//! Full, in-memory decoding of a CAR archive.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::stream::StreamDecoder;
use crate::wire::{Block, RawCid};

/// A fully materialized CAR archive
///
/// `keys` and `blocks` are parallel: `keys[i]` is the CID of `blocks[i]`, both in archive order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    pub roots: Vec<RawCid>,
    pub keys: Vec<RawCid>,
    pub blocks: Vec<Block>,
}

/// Drains `source` through a [StreamDecoder] and keeps every block in memory.
pub fn decode_stream<R: Read>(source: R) -> Result<Decoded> {
    let mut decoder = StreamDecoder::new(source);
    let roots = decoder.header()?.roots().to_vec();
    let blocks = decoder.blocks().collect::<Result<Vec<_>>>()?;
    let keys = blocks.iter().map(|block| block.cid().clone()).collect();
    debug!(roots = roots.len(), blocks = blocks.len(), "CAR archive decoded");
    Ok(Decoded {
        roots,
        keys,
        blocks,
    })
}

/// Decodes a CAR archive held in memory.
pub fn decode_buffer(bytes: &[u8]) -> Result<Decoded> {
    decode_stream(bytes)
}

/// Decodes a whole CAR file into memory.
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<Decoded> {
    let file = File::open(path.as_ref())?;
    debug!(path = ?path.as_ref(), "decoding CAR file");
    decode_stream(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAR_V1: &[u8] = include_bytes!("res/carv1-basic.car");

    #[test]
    fn test_decode_buffer() {
        let decoded = decode_buffer(CAR_V1).unwrap();
        assert_eq!(decoded.roots.len(), 2);
        assert_eq!(decoded.keys.len(), 8);
        assert_eq!(decoded.blocks.len(), 8);
        for (key, block) in decoded.keys.iter().zip(&decoded.blocks) {
            assert_eq!(key, block.cid());
        }
        assert_eq!(decoded.blocks[2].data(), b"cccc");
    }

    #[test]
    fn test_decode_truncated_inside_last_frame() {
        let err = decode_buffer(&CAR_V1[..CAR_V1.len() - 5]).unwrap_err();
        assert!(err.is_truncation());
        assert_eq!(err.to_string(), "Unexpected end of file");
    }

    #[test]
    fn test_decode_truncated_at_frame_boundary() {
        // The last frame (varint 0x36 + 54 bytes) starts at offset 660
        let decoded = decode_buffer(&CAR_V1[..660]).unwrap();
        assert_eq!(decoded.blocks.len(), 7);

        // Header only
        let decoded = decode_buffer(&CAR_V1[..100]).unwrap();
        assert_eq!(decoded.roots.len(), 2);
        assert!(decoded.blocks.is_empty());
    }

    #[test]
    fn test_decode_truncated_header() {
        assert!(decode_buffer(&CAR_V1[..50]).unwrap_err().is_truncation());
    }

    #[test]
    fn test_decode_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("basic.car");
        std::fs::write(&path, CAR_V1).unwrap();
        assert_eq!(decode_file(&path).unwrap(), decode_buffer(CAR_V1).unwrap());
    }
}
