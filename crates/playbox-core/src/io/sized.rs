//! Random-access window over an archive source of declared size.
//!
//! The zip index lives at the end of the archive, so the reader seeks from
//! the end. `SizedSource` makes "the end" mean the declared size rather than
//! whatever the underlying stream happens to contain past it.

use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::{self};

/// Exposes bytes `[0, size)` of a seekable source.
///
/// # Examples
///
/// ```
/// use playbox_core::io::SizedSource;
/// use std::io::{Cursor, Read, Seek, SeekFrom};
///
/// let mut source = SizedSource::new(Cursor::new(b"archive+trailing".to_vec()), 7);
/// source.seek(SeekFrom::End(-3))?;
///
/// let mut tail = String::new();
/// source.read_to_string(&mut tail)?;
/// assert_eq!(tail, "ive");
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct SizedSource<R> {
    inner: R,
    size: u64,
    position: u64,
}

impl<R> SizedSource<R> {
    /// Wraps `inner`, declaring its length as `size` bytes.
    #[must_use]
    pub fn new(inner: R, size: u64) -> Self {
        Self {
            inner,
            size,
            position: 0,
        }
    }

    /// Returns the declared size.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Consumes the wrapper and returns the inner source.
    #[must_use]
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> Read for SizedSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.size.saturating_sub(self.position);
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));
        self.inner.seek(SeekFrom::Start(self.position))?;
        let read = self.inner.read(&mut buf[..want])?;
        self.position += read as u64;
        Ok(read)
    }
}

impl<R: Read + Seek> Seek for SizedSource<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.size.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };

        match target {
            Some(offset) => {
                self.position = offset;
                Ok(offset)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}
