use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::decode::{self, Decoded};
use crate::error::{CarError, Result};
use crate::reader::{CarRead, CarWrite, Entries, Entry};
use crate::wire::RawCid;

/// Reader over a fully decoded archive, every block lives in memory
///
/// Lookups go through a CID → position map; when a CID is stored more than once, `get`
/// returns the first payload while [CarRead::entries] replays every block.
#[derive(Debug)]
pub struct DecodedReader {
    decoded: Decoded,
    positions: HashMap<RawCid, usize>,
    closed: bool,
}

impl DecodedReader {
    /// Wraps an already decoded archive
    pub fn from_decoded(decoded: Decoded) -> Self {
        let mut positions = HashMap::with_capacity(decoded.blocks.len());
        for (position, block) in decoded.blocks.iter().enumerate() {
            positions.entry(block.cid().clone()).or_insert(position);
        }
        DecodedReader {
            decoded,
            positions,
            closed: false,
        }
    }

    /// Decodes an archive held in memory
    pub fn from_buffer(bytes: &[u8]) -> Result<Self> {
        decode::decode_buffer(bytes).map(Self::from_decoded)
    }

    /// Decodes a whole stream into memory
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        decode::decode_stream(source).map(Self::from_decoded)
    }

    /// Decodes a whole file into memory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        decode::decode_file(path).map(Self::from_decoded)
    }

    /// Block CIDs in archive order
    pub fn keys(&self) -> &[RawCid] {
        &self.decoded.keys
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(CarError::Closed);
        }
        Ok(())
    }
}

impl CarRead for DecodedReader {
    fn has(&self, key: &RawCid) -> Result<bool> {
        self.ensure_open()?;
        key.validate()?;
        Ok(self.positions.contains_key(key))
    }

    fn get(&mut self, key: &RawCid) -> Result<Vec<u8>> {
        self.ensure_open()?;
        key.validate()?;
        match self.positions.get(key) {
            Some(&position) => Ok(self.decoded.blocks[position].data().to_vec()),
            None => Err(CarError::NotFound(key.clone())),
        }
    }

    fn roots(&mut self) -> Result<&[RawCid]> {
        self.ensure_open()?;
        Ok(&self.decoded.roots)
    }

    fn entries(&mut self, keys_only: bool) -> Result<Entries<'_>> {
        self.ensure_open()?;
        Ok(Box::new(self.decoded.blocks.iter().map(move |block| -> Result<Entry> {
            Ok(Entry {
                key: block.cid().clone(),
                value: (!keys_only).then(|| block.data().to_vec()),
            })
        })))
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.decoded = Decoded::default();
            self.positions.clear();
        }
        Ok(())
    }
}

impl CarWrite for DecodedReader {
    fn close(&mut self) -> Result<()> {
        CarRead::close(self)
    }
}
