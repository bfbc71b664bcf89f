//! Extraction operation reporting.

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

/// Report of a completed extraction.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// Destination root, in cleaned form.
    pub root: PathBuf,

    /// Number of files written.
    pub files_extracted: usize,

    /// Number of directory entries processed.
    pub directories_created: usize,

    /// Total bytes written to disk.
    pub bytes_written: u64,

    /// Duration of the extraction.
    pub duration: Duration,

    /// Names directly under the root after extraction, sorted.
    pub top_level_entries: Vec<String>,

    /// Permission bits of the root after extraction (Unix only).
    pub root_mode: Option<u32>,

    /// Warnings generated during extraction.
    pub warnings: Vec<String>,
}

impl ExtractionReport {
    /// Creates a new empty extraction report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a warning message to the report.
    pub fn add_warning(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// Returns total number of entries processed.
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.files_extracted + self.directories_created
    }

    /// Returns whether any warnings were generated.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Root permission bits in `ls`-style octal, e.g. `0755`.
    #[must_use]
    pub fn root_mode_octal(&self) -> Option<String> {
        self.root_mode.map(|mode| format!("{mode:04o}"))
    }
}

/// Callback trait for progress reporting during extraction.
///
/// # Examples
///
/// ```
/// use playbox_core::ProgressCallback;
/// use std::path::Path;
///
/// struct SimpleProgress;
///
/// impl ProgressCallback for SimpleProgress {
///     fn on_entry_start(&mut self, path: &Path, total: usize, current: usize) {
///         println!("Processing {}/{}: {}", current, total, path.display());
///     }
///
///     fn on_bytes_written(&mut self, _bytes: u64) {}
///
///     fn on_entry_complete(&mut self, path: &Path) {
///         println!("Completed: {}", path.display());
///     }
///
///     fn on_complete(&mut self) {}
/// }
/// ```
pub trait ProgressCallback: Send {
    /// Called before an entry is processed. `current` is 1-indexed.
    fn on_entry_start(&mut self, path: &Path, total: usize, current: usize);

    /// Called with the size of each file written.
    fn on_bytes_written(&mut self, bytes: u64);

    /// Called once an entry is on disk.
    fn on_entry_complete(&mut self, path: &Path);

    /// Called when the whole archive has been extracted.
    fn on_complete(&mut self);
}

/// No-op implementation of `ProgressCallback`.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_entry_start(&mut self, _path: &Path, _total: usize, _current: usize) {}

    fn on_bytes_written(&mut self, _bytes: u64) {}

    fn on_entry_complete(&mut self, _path: &Path) {}

    fn on_complete(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_report() {
        let report = ExtractionReport::new();
        assert_eq!(report.files_extracted, 0);
        assert_eq!(report.bytes_written, 0);
        assert!(report.top_level_entries.is_empty());
        assert!(!report.has_warnings());
    }

    #[test]
    fn test_total_items() {
        let mut report = ExtractionReport::new();
        report.files_extracted = 10;
        report.directories_created = 5;
        assert_eq!(report.total_items(), 15);
    }

    #[test]
    fn test_add_warning() {
        let mut report = ExtractionReport::new();
        report.add_warning("symlink stored as file".to_string());
        assert!(report.has_warnings());
    }

    #[test]
    fn test_root_mode_octal() {
        let mut report = ExtractionReport::new();
        assert_eq!(report.root_mode_octal(), None);
        report.root_mode = Some(0o750);
        assert_eq!(report.root_mode_octal().as_deref(), Some("0750"));
    }
}
