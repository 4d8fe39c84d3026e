//! Store related functionality for carstore-cli
//!
//! This module opens CAR files with the reader matching the requested access mode and
//! implements the commands of the CLI on top of the [CarRead] / [CarWrite] contracts.
//! Command output goes to any [Write] sink, so the commands can be tested without a terminal.

use std::io::Write;
use std::path::Path;

use carstore::wire::CidFormatError;
use carstore::{
    CarError, CarRead, CarWrite, CarWriter, DecodedReader, IndexedReader, RawCid,
    StreamingReader,
};
use clap::ValueEnum;
use tracing::{debug, info};

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors related to store operations
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed or unreadable CAR archive
    #[error("CAR error: {0}")]
    Car(#[from] CarError),
    /// CID given on the command line cannot be parsed
    #[error("Invalid CID: {0}")]
    InvalidCid(#[from] CidFormatError),
}

/// How a CAR file is read
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadMode {
    /// Decode the whole archive in memory
    Full,
    /// Walk the blocks once, forward only
    Streaming,
    /// Index the file, then read payloads on demand
    #[default]
    Indexed,
}

/// Opens the CAR file at `path` with the reader matching `mode`
pub fn open(path: &Path, mode: ReadMode) -> Result<Box<dyn CarRead>> {
    debug!(path = ?path, mode = ?mode, "opening CAR file");
    let reader: Box<dyn CarRead> = match mode {
        ReadMode::Full => Box::new(DecodedReader::open(path)?),
        ReadMode::Streaming => Box::new(StreamingReader::open(path)?),
        ReadMode::Indexed => Box::new(IndexedReader::open(path)?),
    };
    Ok(reader)
}

/// Prints the root CIDs of the archive, one per line
pub fn list_roots<W: Write>(path: &Path, out: &mut W) -> Result<usize> {
    let mut reader = StreamingReader::open(path)?;
    let roots = reader.roots()?;
    for root in roots {
        writeln!(out, "{root}")?;
    }
    Ok(roots.len())
}

/// Prints `<cid>\t<payload length>` for every block of the archive
pub fn list_blocks<W: Write>(path: &Path, mode: ReadMode, out: &mut W) -> Result<usize> {
    let mut reader = open(path, mode)?;
    let mut count = 0;
    for entry in reader.entries(false)? {
        let entry = entry?;
        let length = entry.value.as_ref().map_or(0, Vec::len);
        writeln!(out, "{}\t{}", entry.key, length)?;
        count += 1;
    }
    reader.close()?;
    Ok(count)
}

/// Writes the raw payload stored under `cid`
pub fn get_block<W: Write>(path: &Path, cid: &str, out: &mut W) -> Result<usize> {
    let cid: RawCid = cid.parse()?;
    let mut reader = IndexedReader::open(path)?;
    let data = reader.get(&cid)?;
    out.write_all(&data)?;
    out.flush()?;
    CarRead::close(&mut reader)?;
    Ok(data.len())
}

/// Appends every block of `src` to `dst`
///
/// When `dst` does not exist yet, it is created with the roots of `src`.
pub fn append(dst: &Path, src: &Path) -> Result<usize> {
    let mut source = StreamingReader::open(src)?;
    let mut writer = if dst.exists() {
        CarWriter::append_to(dst)?
    } else {
        info!(path = ?dst, "creating destination CAR file");
        let mut writer = CarWriter::create(dst)?;
        writer.set_roots(source.roots()?.to_vec())?;
        writer
    };

    let mut count = 0;
    for entry in source.entries(false)? {
        let entry = entry?;
        writer.put(&entry.key, entry.value.as_deref().unwrap_or_default())?;
        count += 1;
    }
    writer.close()?;
    info!(blocks = count, src = ?src, dst = ?dst, "blocks appended");
    Ok(count)
}
