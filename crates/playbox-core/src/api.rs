//! High-level public API for archive extraction.

use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::path::Path;

use tracing::debug;

use crate::ExtractConfig;
use crate::ExtractionReport;
use crate::NoopProgress;
use crate::ProgressCallback;
use crate::Result;
use crate::formats::zip::ZipExtractor;
use crate::types::DestDir;

/// Extracts a zip archive read from `source` into `output_dir`.
///
/// `size` is the archive length in bytes; bytes past it are ignored. The
/// output directory and its ancestors are created if missing (mode 0o750 on
/// Unix).
///
/// # Errors
///
/// Returns an error if:
/// - The output directory cannot be created
/// - The source is not a readable zip archive
/// - An entry name escapes the output directory (nothing more is written)
/// - A quota is exceeded or a write fails
///
/// # Examples
///
/// ```no_run
/// use std::io::Cursor;
///
/// use playbox_core::ExtractConfig;
/// use playbox_core::extract_zip;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("go.zip")?;
/// let size = bytes.len() as u64;
/// let report = extract_zip(Cursor::new(bytes), size, "/go", &ExtractConfig::default())?;
/// println!("Extracted {} files", report.files_extracted);
/// # Ok(())
/// # }
/// ```
pub fn extract_zip<R: Read + Seek, Q: AsRef<Path>>(
    source: R,
    size: u64,
    output_dir: Q,
    config: &ExtractConfig,
) -> Result<ExtractionReport> {
    extract_zip_with_progress(source, size, output_dir, config, &mut NoopProgress)
}

/// Like [`extract_zip`], reporting each entry to `progress`.
///
/// # Errors
///
/// Same as [`extract_zip`].
pub fn extract_zip_with_progress<R: Read + Seek, Q: AsRef<Path>>(
    source: R,
    size: u64,
    output_dir: Q,
    config: &ExtractConfig,
    progress: &mut dyn ProgressCallback,
) -> Result<ExtractionReport> {
    let dest = DestDir::create(output_dir)?;
    let mut zip = ZipExtractor::open(source, size)?;
    debug!(
        root = %dest.as_path().display(),
        entries = zip.len(),
        size,
        "extracting zip archive"
    );
    zip.extract(&dest, config, progress)
}

/// Extracts the zip archive at `archive_path` into `output_dir`.
///
/// # Errors
///
/// Returns `Io` if the archive file cannot be opened, otherwise the same
/// errors as [`extract_zip`].
///
/// # Examples
///
/// ```no_run
/// use playbox_core::ExtractConfig;
/// use playbox_core::extract_archive;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let report = extract_archive("go.zip", "/go", &ExtractConfig::default())?;
/// println!("Top level: {:?}", report.top_level_entries);
/// # Ok(())
/// # }
/// ```
pub fn extract_archive<P: AsRef<Path>, Q: AsRef<Path>>(
    archive_path: P,
    output_dir: Q,
    config: &ExtractConfig,
) -> Result<ExtractionReport> {
    extract_archive_with_progress(archive_path, output_dir, config, &mut NoopProgress)
}

/// Like [`extract_archive`], reporting each entry to `progress`.
///
/// # Errors
///
/// Same as [`extract_archive`].
pub fn extract_archive_with_progress<P: AsRef<Path>, Q: AsRef<Path>>(
    archive_path: P,
    output_dir: Q,
    config: &ExtractConfig,
    progress: &mut dyn ProgressCallback,
) -> Result<ExtractionReport> {
    let file = File::open(archive_path.as_ref())?;
    let size = file.metadata()?.len();
    extract_zip_with_progress(BufReader::new(file), size, output_dir, config, progress)
}
