//! Filesystem writes shared by the extractor.
//!
//! Every function here takes a [`SafePath`], so nothing can be written
//! outside the destination root. Newly created paths are recorded in a
//! [`CreatedPaths`] journal, which the extractor rolls back when
//! `cleanup_on_failure` is set.

use std::fs::File;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tracing::warn;

use crate::ExtractConfig;
use crate::ExtractionError;
use crate::Result;
use crate::copy::CopyBuffer;
use crate::copy::CopyError;
use crate::copy::copy_limited;
use crate::error::QuotaResource;
use crate::security::QuotaTracker;
use crate::security::permissions::DEFAULT_DIR_MODE;
use crate::types::SafePath;

/// Paths created by one extraction run, in creation order.
#[derive(Debug, Default)]
pub struct CreatedPaths {
    entries: Vec<(PathBuf, bool)>,
}

impl CreatedPaths {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record_file(&mut self, path: &Path) {
        self.entries.push((path.to_path_buf(), false));
    }

    fn record_dir(&mut self, path: &Path) {
        self.entries.push((path.to_path_buf(), true));
    }

    /// Number of recorded paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every recorded path, newest first.
    ///
    /// Removal failures are logged and skipped; a directory that still holds
    /// files the run did not create stays in place.
    pub fn rollback(self) {
        for (path, is_dir) in self.entries.into_iter().rev() {
            let removed = if is_dir {
                std::fs::remove_dir(&path)
            } else {
                std::fs::remove_file(&path)
            };
            if let Err(e) = removed {
                warn!(path = %path.display(), error = %e, "cleanup after failed extraction skipped path");
            }
        }
    }
}

/// Writes one file entry and applies `mode`.
///
/// Missing parent directories are created with the default directory mode.
/// An existing file at the path is truncated and overwritten.
///
/// Returns the number of bytes written.
///
/// # Errors
///
/// - `ArchiveFormat` if the entry stream fails (corrupt data, bad CRC)
/// - `QuotaExceeded` if the entry is larger than the quota allows
/// - `Filesystem` if creating, writing or chmod-ing fails
pub fn write_file<R: Read>(
    reader: &mut R,
    safe: &SafePath,
    mode: u32,
    quota: &mut QuotaTracker,
    config: &ExtractConfig,
    buffer: &mut CopyBuffer,
    created: &mut CreatedPaths,
) -> Result<u64> {
    let path = safe.as_path();

    if let Some(parent) = path.parent() {
        create_dir_tracked(parent, created)?;
    }

    let existed = path.exists();
    let file = File::create(path).map_err(|e| ExtractionError::filesystem(path, e))?;
    if !existed {
        created.record_file(path);
    }

    let mut writer = BufWriter::with_capacity(64 * 1024, file);
    let limit = quota.remaining_for_file(config);
    let written = match copy_limited(reader, &mut writer, buffer, limit) {
        Ok(n) => n,
        Err(CopyError::Read(e)) => {
            return Err(ExtractionError::ArchiveFormat(format!(
                "{}: {e}",
                safe.relative().display()
            )));
        }
        Err(CopyError::Write(e)) => return Err(ExtractionError::filesystem(path, e)),
        Err(CopyError::LimitExceeded { copied }) => {
            quota.record_bytes(copied, config)?;
            return Err(ExtractionError::QuotaExceeded {
                resource: QuotaResource::FileSize {
                    size: copied,
                    max: limit,
                },
            });
        }
    };
    writer
        .flush()
        .map_err(|e| ExtractionError::filesystem(path, e))?;
    drop(writer);

    set_mode(path, mode)?;
    quota.record_bytes(written, config)?;

    Ok(written)
}

/// Creates a directory entry and applies `mode`.
///
/// An existing directory counts as success. The root entry itself keeps the
/// mode it was created with.
///
/// # Errors
///
/// Returns `Filesystem` if the directory cannot be created (including when a
/// file is in the way) or its mode cannot be set.
pub fn create_directory(safe: &SafePath, mode: u32, created: &mut CreatedPaths) -> Result<()> {
    create_dir_tracked(safe.as_path(), created)?;
    if !safe.is_root() {
        set_mode(safe.as_path(), mode)?;
    }
    Ok(())
}

/// Creates `dir` and its missing ancestors, recording each one it creates.
fn create_dir_tracked(dir: &Path, created: &mut CreatedPaths) -> Result<()> {
    let mut missing = Vec::new();
    let mut current = Some(dir);
    while let Some(path) = current {
        if path.as_os_str().is_empty() || path.is_dir() {
            break;
        }
        missing.push(path);
        current = path.parent();
    }

    for path in missing.into_iter().rev() {
        let mut builder = std::fs::DirBuilder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(DEFAULT_DIR_MODE);
        }
        match builder.create(path) {
            Ok(()) => created.record_dir(path),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && path.is_dir() => {}
            Err(e) => return Err(ExtractionError::filesystem(path, e)),
        }
    }

    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| ExtractionError::filesystem(path, e))
}

// Permission bits have no counterpart here; extraction still succeeds.
#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    let _ = DEFAULT_DIR_MODE;
    Ok(())
}
