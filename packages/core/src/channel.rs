//! Positioned byte channels over a single value.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use crate::{Error, FileSystem, OpenOptions, Path};

/// A cursor over one content key.
///
/// Every read is a range read starting at the current position and every
/// write is a range write starting there; both advance the position by the
/// number of bytes moved. Writing past the end grows the value, and any gap
/// is zero-filled by the backend.
///
/// A channel holds no connection between calls and owns nothing on the
/// backend, so closing it has no backend effect. A channel is meant for one
/// caller at a time: concurrent writers to the same key are not coordinated.
///
/// `ByteChannel` also implements [`Read`], [`Write`] and [`Seek`], with
/// end-of-stream reported as `Ok(0)`.
pub struct ByteChannel {
    fs: Arc<FileSystem>,
    path: Path,
    key: String,
    position: u64,
    readable: bool,
    writable: bool,
    open: bool,
}

impl ByteChannel {
    pub(crate) fn new(
        fs: Arc<FileSystem>,
        path: Path,
        key: String,
        position: u64,
        options: &OpenOptions,
    ) -> Self {
        Self {
            fs,
            path,
            key,
            position,
            readable: options.is_read(),
            writable: options.is_write(),
            open: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.open {
            Ok(())
        } else {
            Err(Error::Closed {
                resource: format!("channel for {}", self.path.to_absolute_string()),
            })
        }
    }

    /// Read up to `capacity` bytes at the current position.
    ///
    /// Returns `None` at end of stream, leaving the position where it was.
    pub fn read_chunk(&mut self, capacity: usize) -> Result<Option<Vec<u8>>, Error> {
        self.ensure_open()?;
        if !self.readable {
            return Err(Error::unsupported("read on a write-only channel"));
        }
        if capacity == 0 {
            return Ok(Some(Vec::new()));
        }

        let start = self.position;
        let end = start.saturating_add(capacity as u64 - 1);
        let key = &self.key;
        let bytes = self
            .fs
            .with_connection(|conn| Ok(conn.get_range(key, start, end)?))?;

        if bytes.is_empty() {
            return Ok(None);
        }
        self.position += bytes.len() as u64;
        Ok(Some(bytes))
    }

    /// Write `bytes` at the current position, returning how many were written.
    pub fn write_chunk(&mut self, bytes: &[u8]) -> Result<usize, Error> {
        self.ensure_open()?;
        if !self.writable {
            return Err(Error::unsupported("write on a read-only channel"));
        }
        if bytes.is_empty() {
            return Ok(0);
        }

        let offset = self.position;
        let key = &self.key;
        self.fs
            .with_connection(|conn| Ok(conn.set_range(key, offset, bytes)?))?;

        self.position += bytes.len() as u64;
        Ok(bytes.len())
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Move the cursor. Positions past the end are allowed; a later write
    /// there zero-fills the gap.
    pub fn set_position(&mut self, position: u64) -> Result<(), Error> {
        self.ensure_open()?;
        self.position = position;
        Ok(())
    }

    /// Current length of the value.
    pub fn size(&self) -> Result<u64, Error> {
        self.ensure_open()?;
        let key = &self.key;
        self.fs.with_connection(|conn| Ok(conn.strlen(key)?))
    }

    /// The backend cannot shrink a value in place.
    pub fn truncate(&mut self, _size: u64) -> Result<(), Error> {
        self.ensure_open()?;
        Err(Error::unsupported("truncate"))
    }

    /// Close the channel. Idempotent.
    pub fn close(&mut self) {
        self.open = false;
    }
}

impl Read for ByteChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read_chunk(buf.len())? {
            Some(bytes) => {
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            None => Ok(0),
        }
    }
}

impl Write for ByteChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_chunk(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for ByteChannel {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(delta) => self.size()?.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        }
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            )
        })?;
        self.set_position(target)?;
        Ok(target)
    }
}
