//! CAR v1 writer
//!
//! The writer streams an archive to any [Write] sink: the header frame once the roots are
//! fixed, then one frame per block, each flushed as soon as it is written. Nothing is
//! buffered across blocks, so archives can be larger than the available memory.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{debug, trace, warn};

use crate::error::{CarError, Result};
use crate::reader::CarWrite;
use crate::wire::frame;
use crate::wire::{BlockLocation, CarHeader, RawCid};

/// Lifecycle of a [CarWriter]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    /// No header written yet, roots can be set once
    AwaitingRoots,
    /// Header written, blocks can be appended
    RootsFixed,
    /// The destination already holds a header, roots can never be set
    Appending,
    Closed,
}

/// CAR v1 writer
///
/// ## Examples
/// ```
/// use carstore::{CarRead, CarWrite, CarWriter, DecodedReader, RawCid};
///
/// let root: RawCid = "01551220b6fbd675f98e2abd22d4ed29fdc83150fedc48597e92dd1a7a24381d44a27451"
///     .parse()
///     .unwrap();
///
/// let mut writer = CarWriter::new(Vec::new());
/// writer.set_roots(vec![root.clone()]).unwrap();
/// writer.put(&root, b"cccc").unwrap();
/// CarWrite::close(&mut writer).unwrap();
/// let bytes = writer.into_inner();
///
/// let mut reader = DecodedReader::from_buffer(&bytes).unwrap();
/// assert_eq!(reader.roots().unwrap(), &[root.clone()]);
/// assert_eq!(reader.get(&root).unwrap(), b"cccc");
/// ```
#[derive(Debug)]
pub struct CarWriter<W: Write> {
    sink: W,
    state: WriterState,
    roots: Vec<RawCid>,
    /// Number of bytes of the destination before the next frame
    offset: u64,
}

impl<W: Write> CarWriter<W> {
    /// Creates a writer over an empty destination.
    ///
    /// Roots are set with [CarWrite::set_roots]; if a block is written first, an empty list
    /// of roots is committed.
    pub fn new(sink: W) -> Self {
        CarWriter {
            sink,
            state: WriterState::AwaitingRoots,
            roots: Vec::new(),
            offset: 0,
        }
    }

    /// Creates a writer and commits `roots` right away.
    pub fn with_roots(sink: W, roots: Vec<RawCid>) -> Result<Self> {
        let mut writer = Self::new(sink);
        writer.set_roots(roots)?;
        Ok(writer)
    }

    /// Creates a writer continuing an archive whose header was already committed.
    ///
    /// `offset` is the current length of the destination, used to report block locations.
    /// Such a writer rejects [CarWrite::set_roots].
    pub fn appending(sink: W, offset: u64) -> Self {
        CarWriter {
            sink,
            state: WriterState::Appending,
            roots: Vec::new(),
            offset,
        }
    }

    /// Roots committed by this writer (always empty for an appending writer)
    pub fn roots(&self) -> &[RawCid] {
        &self.roots
    }

    /// Number of bytes written to the destination so far (including any prior content when appending)
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Writes one block frame and returns where its payload landed.
    pub fn write_block(&mut self, key: &RawCid, value: &[u8]) -> Result<BlockLocation> {
        if self.state == WriterState::Closed {
            return Err(CarError::Closed);
        }
        key.validate()?;
        if self.state == WriterState::AwaitingRoots {
            self.write_header(Vec::new())?;
        }
        let written = self.write_frame(&[key.bytes(), value])?;
        let location = BlockLocation {
            offset: self.offset + written - value.len() as u64,
            length: value.len() as u64,
        };
        self.offset += written;
        trace!(cid = %key, offset = location.offset, length = location.length, "block written");
        Ok(location)
    }

    /// Gives the sink back
    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Writes one frame; a failed write may leave a partial frame behind, so the writer
    /// refuses any further frame.
    fn write_frame(&mut self, parts: &[&[u8]]) -> Result<u64> {
        frame::write_frame(&mut self.sink, parts).inspect_err(|err| {
            warn!(offset = self.offset, error = %err, "CAR frame write failed, writer closed");
            self.state = WriterState::Closed;
        })
    }

    fn write_header(&mut self, roots: Vec<RawCid>) -> Result<()> {
        let body = CarHeader::new(roots.clone()).to_bytes()?;
        self.offset += self.write_frame(&[body.as_slice()])?;
        debug!(roots = roots.len(), "CAR header written");
        self.roots = roots;
        self.state = WriterState::RootsFixed;
        Ok(())
    }
}

impl CarWriter<BufWriter<File>> {
    /// Creates (or truncates) the CAR file at `path`
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        debug!(path = ?path.as_ref(), "creating CAR file");
        Ok(Self::new(BufWriter::new(file)))
    }

    /// Appends blocks to the existing CAR file at `path`
    pub fn append_to<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().append(true).open(path.as_ref())?;
        let length = file.metadata()?.len();
        if length == 0 {
            return Err(CarError::ProtocolViolation(
                "cannot append to a CAR file without header",
            ));
        }
        debug!(path = ?path.as_ref(), offset = length, "appending to CAR file");
        Ok(Self::appending(BufWriter::new(file), length))
    }
}

impl<W: Write> CarWrite for CarWriter<W> {
    fn set_roots(&mut self, roots: Vec<RawCid>) -> Result<()> {
        match self.state {
            WriterState::AwaitingRoots => {}
            WriterState::RootsFixed => {
                return Err(CarError::ProtocolViolation("roots are already fixed"));
            }
            WriterState::Appending => {
                return Err(CarError::Unsupported(
                    "set_roots on an appending writer, the header is already committed",
                ));
            }
            WriterState::Closed => return Err(CarError::Closed),
        }
        for root in &roots {
            root.validate()?;
        }
        self.write_header(roots)
    }

    fn put(&mut self, key: &RawCid, value: &[u8]) -> Result<()> {
        self.write_block(key, value).map(|_| ())
    }

    fn close(&mut self) -> Result<()> {
        match self.state {
            WriterState::Closed => return Ok(()),
            // An archive always starts with a header
            WriterState::AwaitingRoots => self.write_header(Vec::new())?,
            WriterState::RootsFixed | WriterState::Appending => {}
        }
        self.sink.flush()?;
        self.state = WriterState::Closed;
        debug!(size = self.offset, "CAR writer closed");
        Ok(())
    }
}
