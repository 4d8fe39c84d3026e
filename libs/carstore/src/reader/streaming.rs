use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::debug;

use crate::error::{CarError, Result};
use crate::reader::{CarRead, CarWrite, Entries, Entry};
use crate::stream::StreamDecoder;
use crate::wire::RawCid;

/// Forward-only reader over a byte stream
///
/// Blocks can only be consumed through [CarRead::entries], once: a second call continues
/// where the previous iteration stopped. Random access (`has`, `get`) is not supported.
#[derive(Debug)]
pub struct StreamingReader<R> {
    /// `None` once closed
    decoder: Option<StreamDecoder<R>>,
}

impl<R: Read> StreamingReader<R> {
    /// Creates a reader over `source`, nothing is read yet
    pub fn new(source: R) -> Self {
        StreamingReader {
            decoder: Some(StreamDecoder::new(source)),
        }
    }

    fn decoder(&mut self) -> Result<&mut StreamDecoder<R>> {
        self.decoder.as_mut().ok_or(CarError::Closed)
    }
}

impl StreamingReader<BufReader<File>> {
    /// Streams the blocks of a CAR file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        debug!(path = ?path.as_ref(), "streaming CAR file");
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> CarRead for StreamingReader<R> {
    fn has(&self, _key: &RawCid) -> Result<bool> {
        Err(CarError::Unsupported("has on a streaming reader"))
    }

    fn get(&mut self, _key: &RawCid) -> Result<Vec<u8>> {
        Err(CarError::Unsupported("get on a streaming reader"))
    }

    /// Reads the header frame if it was not read yet
    fn roots(&mut self) -> Result<&[RawCid]> {
        Ok(self.decoder()?.header()?.roots())
    }

    fn entries(&mut self, keys_only: bool) -> Result<Entries<'_>> {
        let blocks = self.decoder()?.blocks();
        Ok(Box::new(blocks.map(move |block| {
            block.map(|block| {
                let (key, data) = block.into_parts();
                Entry::new(key, data, keys_only)
            })
        })))
    }

    fn close(&mut self) -> Result<()> {
        self.decoder = None;
        Ok(())
    }
}

impl<R: Read> CarWrite for StreamingReader<R> {
    fn close(&mut self) -> Result<()> {
        CarRead::close(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_buffer;

    const CAR_V1: &[u8] = include_bytes!("../res/carv1-basic.car");

    #[test]
    fn test_streaming_reader_roots_then_entries() {
        let mut reader = StreamingReader::new(CAR_V1);
        let roots = reader.roots().unwrap().to_vec();
        assert_eq!(roots, decode_buffer(CAR_V1).unwrap().roots);

        let keys: Vec<_> = reader
            .entries(true)
            .unwrap()
            .map(|entry| entry.unwrap().key)
            .collect();
        assert_eq!(keys, decode_buffer(CAR_V1).unwrap().keys);
        // Roots stay available once the blocks are consumed
        assert_eq!(reader.roots().unwrap(), roots.as_slice());
    }

    #[test]
    fn test_streaming_reader_entries_are_single_pass() {
        let mut reader = StreamingReader::new(CAR_V1);
        let first: Vec<_> = reader.entries(false).unwrap().take(2).collect();
        assert_eq!(first.len(), 2);
        assert_eq!(reader.entries(false).unwrap().count(), 6);
        assert_eq!(reader.entries(false).unwrap().count(), 0);
    }

    #[test]
    fn test_streaming_reader_values() {
        let mut reader = StreamingReader::new(CAR_V1);
        let values: Vec<_> = reader
            .entries(false)
            .unwrap()
            .map(|entry| entry.unwrap().value.unwrap())
            .collect();
        assert_eq!(values[2], b"cccc");
        assert_eq!(values.iter().map(Vec::len).sum::<usize>(), 323);
    }

    #[test]
    fn test_streaming_reader_declines_random_access() {
        let mut reader = StreamingReader::new(CAR_V1);
        let key = RawCid::from_hex(
            "01551220b6fbd675f98e2abd22d4ed29fdc83150fedc48597e92dd1a7a24381d44a27451",
        )
        .unwrap();
        assert!(matches!(reader.has(&key), Err(CarError::Unsupported(_))));
        assert!(matches!(reader.get(&key), Err(CarError::Unsupported(_))));
        assert!(matches!(
            reader.put(&key, b"blip"),
            Err(CarError::Unsupported(_))
        ));
        assert!(matches!(
            reader.set_roots(Vec::new()),
            Err(CarError::Unsupported(_))
        ));
    }

    #[test]
    fn test_streaming_reader_truncated() {
        let mut reader = StreamingReader::new(&CAR_V1[..CAR_V1.len() - 5]);
        let last = reader.entries(true).unwrap().last().unwrap();
        assert!(last.unwrap_err().is_truncation());
    }

    #[test]
    fn test_streaming_reader_close() {
        let mut reader = StreamingReader::new(CAR_V1);
        CarRead::close(&mut reader).unwrap();
        CarRead::close(&mut reader).unwrap();
        assert!(matches!(reader.roots(), Err(CarError::Closed)));
        assert!(reader.entries(true).is_err());
    }
}
