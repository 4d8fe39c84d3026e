use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CarError, Result};
use crate::index::{self, CarIndex};
use crate::reader::{CarRead, CarWrite, Entries, Entry};
use crate::wire::RawCid;

/// File handle used for block reads, opened on first need
#[derive(Debug)]
enum Handle {
    Unopened,
    Open(File),
    Closed,
}

/// Random-access reader over a CAR file
///
/// The file is indexed once at construction (see [crate::index]). Payloads are only read
/// when asked for, through a file handle opened on the first read and kept until
/// [CarRead::close].
#[derive(Debug)]
pub struct IndexedReader {
    path: PathBuf,
    index: CarIndex,
    handle: Handle,
}

impl IndexedReader {
    /// Indexes the CAR file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut source = BufReader::new(File::open(&path)?);
        let index = index::build_index(&mut source)?;
        debug!(path = ?path, blocks = index.len(), "CAR file indexed");
        Ok(Self::from_index(path, index))
    }

    /// Reader over a CAR file indexed beforehand
    pub fn from_index(path: PathBuf, index: CarIndex) -> Self {
        IndexedReader {
            path,
            index,
            handle: Handle::Unopened,
        }
    }

    /// The block index of the file
    pub fn index(&self) -> &CarIndex {
        &self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_open(&self) -> Result<()> {
        if let Handle::Closed = self.handle {
            return Err(CarError::Closed);
        }
        Ok(())
    }

    /// Opens the file handle once, then hands out the cached one
    fn file<'a>(handle: &'a mut Handle, path: &Path) -> Result<&'a mut File> {
        match *handle {
            Handle::Closed => return Err(CarError::Closed),
            Handle::Unopened => {
                debug!(path = ?path, "opening CAR file for block reads");
                *handle = Handle::Open(File::open(path)?);
            }
            Handle::Open(_) => {}
        }
        match handle {
            Handle::Open(file) => Ok(file),
            _ => Err(CarError::Closed),
        }
    }
}

impl CarRead for IndexedReader {
    fn has(&self, key: &RawCid) -> Result<bool> {
        self.ensure_open()?;
        key.validate()?;
        Ok(self.index.contains(key))
    }

    fn get(&mut self, key: &RawCid) -> Result<Vec<u8>> {
        self.ensure_open()?;
        key.validate()?;
        let location = self
            .index
            .get(key)
            .ok_or_else(|| CarError::NotFound(key.clone()))?;
        let file = Self::file(&mut self.handle, &self.path)?;
        index::read_block(file, location)
    }

    fn roots(&mut self) -> Result<&[RawCid]> {
        self.ensure_open()?;
        Ok(self.index.roots())
    }

    fn entries(&mut self, keys_only: bool) -> Result<Entries<'_>> {
        self.ensure_open()?;
        if keys_only {
            return Ok(Box::new(self.index.keys().map(|key| -> Result<Entry> {
                Ok(Entry {
                    key: key.clone(),
                    value: None,
                })
            })));
        }
        let file = Self::file(&mut self.handle, &self.path)?;
        Ok(Box::new(self.index.iter().map(move |(key, location)| -> Result<Entry> {
            let value = index::read_block(&mut *file, location)?;
            Ok(Entry::new(key.clone(), value, false))
        })))
    }

    fn close(&mut self) -> Result<()> {
        if let Handle::Open(_) = self.handle {
            debug!(path = ?self.path, "closing CAR file");
        }
        self.handle = Handle::Closed;
        Ok(())
    }
}

impl CarWrite for IndexedReader {
    fn close(&mut self) -> Result<()> {
        CarRead::close(self)
    }
}
