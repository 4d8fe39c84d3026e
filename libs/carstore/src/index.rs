//! # Block index of a CAR v1 archive
//!
//! The indexer walks a random-access source once, frame by frame. For every block it only
//! reads the length prefix and the CID, then seeks over the payload: the cost of indexing
//! depends on the number of blocks, not on the size of their payloads.
//!
//! The resulting [CarIndex] maps each CID to the [BlockLocation] of its payload and keeps
//! the CIDs in the order they were first seen in the archive.
//!
//! When a CID appears more than once, the first occurrence is indexed and later ones are
//! skipped (and logged).

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::io::{Read, Seek, SeekFrom};

use tracing::{debug, trace};

use crate::error::{CarError, Result};
use crate::wire::cid::CidFormatError;
use crate::wire::frame;
use crate::wire::{BlockLocation, CarHeader, RawCid};

/// Index of the blocks of a CAR archive, see the [module documentation](self)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarIndex {
    roots: Vec<RawCid>,
    entries: HashMap<RawCid, BlockLocation>,
    order: Vec<RawCid>,
}

impl CarIndex {
    /// Root CIDs from the archive header
    pub fn roots(&self) -> &[RawCid] {
        &self.roots
    }

    /// Number of distinct indexed CIDs
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, cid: &RawCid) -> bool {
        self.entries.contains_key(cid)
    }

    /// Location of the payload of `cid`, if indexed
    pub fn get(&self, cid: &RawCid) -> Option<BlockLocation> {
        self.entries.get(cid).copied()
    }

    /// Indexed CIDs in archive order
    pub fn keys(&self) -> impl Iterator<Item = &RawCid> {
        self.order.iter()
    }

    /// Indexed CIDs and their payload locations, in archive order
    pub fn iter(&self) -> impl Iterator<Item = (&RawCid, BlockLocation)> {
        self.order.iter().map(|cid| (cid, self.entries[cid]))
    }

    fn insert(&mut self, cid: RawCid, location: BlockLocation) {
        match self.entries.entry(cid) {
            Entry::Vacant(vacant) => {
                self.order.push(vacant.key().clone());
                vacant.insert(location);
            }
            Entry::Occupied(occupied) => {
                debug!(cid = %occupied.key(), offset = location.offset, "duplicate CID skipped");
            }
        }
    }
}

/// Builds the [CarIndex] of the archive held by `source`, starting at offset 0.
///
/// Any truncation (a length prefix cut short, or a frame longer than the bytes left in the
/// source) fails the whole build with [CarError::UnexpectedEof]: an index is never partial.
pub fn build_index<R: Read + Seek>(source: &mut R) -> Result<CarIndex> {
    let end = source.seek(SeekFrom::End(0))?;
    source.seek(SeekFrom::Start(0))?;

    let (header_length, prefix_size) =
        frame::read_frame_length(source)?.ok_or(CarError::UnexpectedEof)?;
    let mut position = span_end(prefix_size as u64, header_length, end)?;
    let mut header_body = Vec::new();
    (&mut *source)
        .take(header_length)
        .read_to_end(&mut header_body)?;
    let header = CarHeader::from_bytes(&header_body)?;

    let mut index = CarIndex {
        roots: header.into_roots(),
        ..CarIndex::default()
    };

    loop {
        source.seek(SeekFrom::Start(position))?;
        let Some((length, prefix_size)) = frame::read_frame_length(source)? else {
            break;
        };
        let body_start = position + prefix_size as u64;
        let frame_end = span_end(body_start, length, end)?;

        // Only the CID is read, bounded to the frame body
        let (cid, cid_size) = match RawCid::read_from(&mut (&mut *source).take(length)) {
            Ok(read) => read,
            Err(CidFormatError::InsufficientData) => {
                return Err(CarError::InvalidFrame(format!(
                    "CID overruns the frame at offset {position}"
                )));
            }
            Err(CidFormatError::Io(e)) => return Err(e.into()),
            Err(e) => {
                return Err(CarError::InvalidFrame(format!(
                    "{e} (frame at offset {position})"
                )));
            }
        };
        let location = BlockLocation {
            offset: body_start + cid_size as u64,
            length: length - cid_size as u64,
        };
        trace!(cid = %cid, offset = location.offset, length = location.length, "block indexed");
        index.insert(cid, location);
        position = frame_end;
    }

    debug!(
        roots = index.roots.len(),
        blocks = index.len(),
        size = end,
        "CAR index built"
    );
    Ok(index)
}

/// Offset right after `length` bytes starting at `start`, truncation if past `end`.
///
/// Lengths come straight from the source and may be close to `u64::MAX`.
fn span_end(start: u64, length: u64, end: u64) -> Result<u64> {
    start
        .checked_add(length)
        .filter(|&stop| stop <= end)
        .ok_or(CarError::UnexpectedEof)
}

/// Reads exactly the payload at `location` from `source`.
pub fn read_block<R: Read + Seek>(source: &mut R, location: BlockLocation) -> Result<Vec<u8>> {
    source.seek(SeekFrom::Start(location.offset))?;
    let mut data = Vec::new();
    let read = (&mut *source)
        .take(location.length)
        .read_to_end(&mut data)?;
    if (read as u64) < location.length {
        return Err(CarError::UnexpectedEof);
    }
    Ok(data)
}
