//! ZIP archive extraction.
//!
//! Entries are processed in central-directory order. Each name goes through
//! the [`PathGuard`] before anything touches the disk, and the first failure
//! stops the run.

use std::fs;
use std::io::Read;
use std::io::Seek;
use std::time::Instant;

use tracing::debug;
use tracing::info;
use tracing::warn;

use super::common::CreatedPaths;
use super::common::create_directory;
use super::common::write_file;
use crate::ExtractConfig;
use crate::ExtractionError;
use crate::ExtractionReport;
use crate::ProgressCallback;
use crate::Result;
use crate::copy::CopyBuffer;
use crate::io::SizedSource;
use crate::security::PathGuard;
use crate::security::QuotaTracker;
use crate::security::permissions::is_symlink_mode;
use crate::security::permissions::sanitize_mode;
use crate::types::DestDir;

/// A zip archive opened from a random-access source of known size.
///
/// # Examples
///
/// ```no_run
/// use playbox_core::ExtractConfig;
/// use playbox_core::NoopProgress;
/// use playbox_core::formats::zip::ZipExtractor;
/// use playbox_core::types::DestDir;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let file = std::fs::File::open("go.zip")?;
/// let size = file.metadata()?.len();
/// let dest = DestDir::create("/go")?;
///
/// let mut zip = ZipExtractor::open(file, size)?;
/// let report = zip.extract(&dest, &ExtractConfig::default(), &mut NoopProgress)?;
/// println!("{} files", report.files_extracted);
/// # Ok(())
/// # }
/// ```
pub struct ZipExtractor<R: Read + Seek> {
    archive: zip::ZipArchive<SizedSource<R>>,
}

impl<R: Read + Seek> ZipExtractor<R> {
    /// Reads the central directory of `source`, treating its length as `size`.
    ///
    /// # Errors
    ///
    /// Returns `ArchiveFormat` if the bytes are not a readable zip archive.
    pub fn open(source: R, size: u64) -> Result<Self> {
        let archive = zip::ZipArchive::new(SizedSource::new(source, size))?;
        Ok(Self { archive })
    }

    /// Number of entries in the central directory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// Returns `true` if the archive has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// Extracts every entry under `dest`.
    ///
    /// # Errors
    ///
    /// Returns the first error hit. With `cleanup_on_failure` set, paths this
    /// run created are removed before the error is returned; otherwise they
    /// stay on disk.
    pub fn extract(
        &mut self,
        dest: &DestDir,
        config: &ExtractConfig,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ExtractionReport> {
        let start = Instant::now();
        let guard = PathGuard::new(dest);
        let mut report = ExtractionReport::new();
        report.root = dest.as_path().to_path_buf();
        let mut created = CreatedPaths::new();

        if let Err(err) = self.extract_entries(&guard, config, progress, &mut report, &mut created) {
            warn!(
                root = %dest.as_path().display(),
                created = created.len(),
                error = %err,
                "extraction failed"
            );
            if config.cleanup_on_failure {
                created.rollback();
            }
            return Err(err);
        }

        summarize_root(&mut report)?;
        report.duration = start.elapsed();
        progress.on_complete();

        info!(
            root = %report.root.display(),
            files = report.files_extracted,
            directories = report.directories_created,
            bytes = report.bytes_written,
            "archive extracted"
        );

        Ok(report)
    }

    fn extract_entries(
        &mut self,
        guard: &PathGuard,
        config: &ExtractConfig,
        progress: &mut dyn ProgressCallback,
        report: &mut ExtractionReport,
        created: &mut CreatedPaths,
    ) -> Result<()> {
        let total = self.archive.len();
        let mut buffer = CopyBuffer::new();
        let mut quota = QuotaTracker::new();

        for index in 0..total {
            let mut entry = self.archive.by_index(index)?;
            let name = entry.name().to_owned();
            let safe = guard.validate(&name)?;
            let stored_mode = entry.unix_mode();

            progress.on_entry_start(safe.relative(), total, index + 1);

            if entry.is_dir() {
                create_directory(&safe, sanitize_mode(stored_mode, true), created)?;
                report.directories_created += 1;
                debug!(entry = %name, "directory created");
            } else {
                if is_symlink_mode(stored_mode) {
                    report.add_warning(format!(
                        "symlink entry '{name}' written as a regular file"
                    ));
                }
                quota.start_file(config)?;
                let written = write_file(
                    &mut entry,
                    &safe,
                    sanitize_mode(stored_mode, false),
                    &mut quota,
                    config,
                    &mut buffer,
                    created,
                )?;
                report.files_extracted += 1;
                report.bytes_written += written;
                progress.on_bytes_written(written);
                debug!(entry = %name, bytes = written, "file written");
            }

            progress.on_entry_complete(safe.relative());
        }

        Ok(())
    }
}

/// Records the root's top-level names and mode once extraction is done.
fn summarize_root(report: &mut ExtractionReport) -> Result<()> {
    let root = report.root.clone();
    let read_dir = fs::read_dir(&root).map_err(|e| ExtractionError::filesystem(&root, e))?;

    let mut names = Vec::new();
    for item in read_dir {
        let item = item.map_err(|e| ExtractionError::filesystem(&root, e))?;
        names.push(item.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    report.top_level_entries = names;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = fs::metadata(&root).map_err(|e| ExtractionError::filesystem(&root, e))?;
        report.root_mode = Some(metadata.permissions().mode() & 0o7777);
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::NoopProgress;
    use crate::test_utils::ZipBuilder;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn open(bytes: Vec<u8>) -> ZipExtractor<Cursor<Vec<u8>>> {
        let size = bytes.len() as u64;
        ZipExtractor::open(Cursor::new(bytes), size).unwrap()
    }

    fn dest() -> (TempDir, DestDir) {
        let temp = TempDir::new().unwrap();
        let dest = DestDir::create(temp.path().join("go")).unwrap();
        (temp, dest)
    }

    #[test]
    fn test_open_rejects_garbage() {
        let bytes = b"definitely not a zip".to_vec();
        let size = bytes.len() as u64;
        let result = ZipExtractor::open(Cursor::new(bytes), size);
        assert!(matches!(result, Err(ExtractionError::ArchiveFormat(_))));
    }

    #[test]
    fn test_extract_files_and_dirs() {
        let bytes = ZipBuilder::new()
            .add_directory("bin/")
            .add_file_with_mode("bin/go", b"#!/bin/sh\n", 0o755)
            .add_file("VERSION", b"go1.22")
            .build();
        let (_temp, dest) = dest();

        let mut zip = open(bytes);
        assert_eq!(zip.len(), 3);
        let report = zip
            .extract(&dest, &ExtractConfig::default(), &mut NoopProgress)
            .unwrap();

        assert_eq!(report.files_extracted, 2);
        assert_eq!(report.directories_created, 1);
        assert_eq!(report.bytes_written, 16);
        assert_eq!(report.top_level_entries, vec!["VERSION", "bin"]);
        assert_eq!(
            fs::read(dest.as_path().join("VERSION")).unwrap(),
            b"go1.22"
        );
    }

    #[test]
    fn test_traversal_stops_before_later_entries() {
        let bytes = ZipBuilder::new()
            .add_file("ok.txt", b"ok")
            .add_file("../evil.txt", b"evil")
            .add_file("later.txt", b"later")
            .build();
        let (temp, dest) = dest();

        let result = open(bytes).extract(&dest, &ExtractConfig::default(), &mut NoopProgress);

        assert!(matches!(result, Err(ExtractionError::PathTraversal { .. })));
        assert!(dest.as_path().join("ok.txt").exists());
        assert!(!dest.as_path().join("later.txt").exists());
        assert!(!temp.path().join("evil.txt").exists());
    }

    #[test]
    fn test_cleanup_on_failure_removes_partial_output() {
        let bytes = ZipBuilder::new()
            .add_file("pkg/a.txt", b"a")
            .add_file("/etc/passwd", b"root")
            .build();
        let (_temp, dest) = dest();
        let config = ExtractConfig {
            cleanup_on_failure: true,
            ..Default::default()
        };

        let result = open(bytes).extract(&dest, &config, &mut NoopProgress);

        assert!(result.is_err());
        assert!(!dest.as_path().join("pkg").exists());
        assert!(dest.as_path().exists());
    }

    #[test]
    fn test_file_count_quota() {
        let bytes = ZipBuilder::new()
            .add_file("a", b"1")
            .add_file("b", b"2")
            .add_file("c", b"3")
            .build();
        let (_temp, dest) = dest();
        let config = ExtractConfig {
            max_file_count: 2,
            ..Default::default()
        };

        let err = open(bytes)
            .extract(&dest, &config, &mut NoopProgress)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::QuotaExceeded { .. }));
    }

    #[test]
    fn test_symlink_entry_written_as_file() {
        let bytes = ZipBuilder::new()
            .add_symlink("current", "bin/go")
            .build();
        let (_temp, dest) = dest();

        let report = open(bytes)
            .extract(&dest, &ExtractConfig::default(), &mut NoopProgress)
            .unwrap();

        let path = dest.as_path().join("current");
        assert!(path.is_file());
        assert_eq!(fs::read(path).unwrap(), b"bin/go");
        assert!(report.has_warnings());
    }

    #[test]
    #[cfg(unix)]
    fn test_modes_applied() {
        use std::os::unix::fs::PermissionsExt;

        let bytes = ZipBuilder::new()
            .add_file_with_mode("run.sh", b"echo", 0o4755)
            .add_file_with_mode("secret", b"x", 0o600)
            .build();
        let (_temp, dest) = dest();

        open(bytes)
            .extract(&dest, &ExtractConfig::default(), &mut NoopProgress)
            .unwrap();

        let mode = |name: &str| {
            fs::metadata(dest.as_path().join(name))
                .unwrap()
                .permissions()
                .mode()
                & 0o7777
        };
        assert_eq!(mode("run.sh"), 0o755);
        assert_eq!(mode("secret"), 0o600);
    }

    #[test]
    fn test_empty_archive() {
        let bytes = ZipBuilder::new().build();
        let (_temp, dest) = dest();

        let mut zip = open(bytes);
        assert!(zip.is_empty());
        let report = zip
            .extract(&dest, &ExtractConfig::default(), &mut NoopProgress)
            .unwrap();
        assert_eq!(report.total_items(), 0);
        assert!(report.top_level_entries.is_empty());
    }
}
