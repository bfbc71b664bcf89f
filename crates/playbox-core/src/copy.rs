//! Bounded entry copy with a reusable buffer.
//!
//! Entry streams are copied chunk by chunk so a size limit is enforced while
//! reading, before an oversized entry reaches the disk. Read and write
//! failures are reported separately: a failing read means a corrupt entry
//! stream, a failing write means a filesystem problem.

use std::io::Read;
use std::io::Write;
use std::io::{self};

/// Buffer size for entry copies (64KB).
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Reusable copy buffer shared by all entries of one extraction.
#[derive(Debug)]
pub struct CopyBuffer {
    #[allow(clippy::large_stack_arrays)]
    buf: [u8; COPY_BUFFER_SIZE],
}

impl CopyBuffer {
    /// Creates a new zeroed copy buffer.
    #[inline]
    #[must_use]
    #[allow(clippy::large_stack_arrays)]
    pub fn new() -> Self {
        Self {
            buf: [0u8; COPY_BUFFER_SIZE],
        }
    }

    /// Returns the buffer size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        COPY_BUFFER_SIZE
    }
}

impl Default for CopyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a bounded copy stopped early.
#[derive(Debug)]
pub enum CopyError {
    /// The source stream failed.
    Read(io::Error),
    /// The destination failed.
    Write(io::Error),
    /// The source produced more than the limit; `copied` bytes were seen.
    LimitExceeded {
        /// Bytes read before the copy was stopped.
        copied: u64,
    },
}

/// Copies `reader` into `writer`, failing once more than `limit` bytes are
/// read.
///
/// Bytes past the limit are never written.
///
/// # Errors
///
/// See [`CopyError`].
///
/// # Examples
///
/// ```
/// use playbox_core::copy::{CopyBuffer, copy_limited};
///
/// let mut buffer = CopyBuffer::new();
/// let mut output = Vec::new();
/// let copied = copy_limited(&mut &b"hello"[..], &mut output, &mut buffer, 1024).unwrap();
/// assert_eq!(copied, 5);
///
/// assert!(copy_limited(&mut &b"hello"[..], &mut Vec::new(), &mut buffer, 4).is_err());
/// ```
pub fn copy_limited<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut CopyBuffer,
    limit: u64,
) -> Result<u64, CopyError> {
    let mut total: u64 = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer.buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyError::Read(e)),
        };

        let next = total.saturating_add(bytes_read as u64);
        if next > limit {
            return Err(CopyError::LimitExceeded { copied: next });
        }

        writer
            .write_all(&buffer.buf[..bytes_read])
            .map_err(CopyError::Write)?;
        total = next;
    }

    Ok(total)
}
