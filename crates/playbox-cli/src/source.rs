//! Archive sources: a local file or an http(s) download.

use anyhow::Context;
use anyhow::Result;
use playbox_core::ExtractConfig;
use playbox_core::ExtractionReport;
use playbox_core::ProgressCallback;
use playbox_core::extract_archive_with_progress;
use playbox_core::extract_zip_with_progress;
use std::io::Cursor;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use tracing::info;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

pub enum ArchiveSource {
    File(PathBuf),
    Remote { url: String, bytes: Vec<u8> },
}

impl ArchiveSource {
    /// Resolves `source`, downloading it first when it is an http(s) URL.
    pub fn resolve(source: &str) -> Result<Self> {
        if is_url(source) {
            let bytes = download(source)?;
            Ok(Self::Remote {
                url: source.to_string(),
                bytes,
            })
        } else {
            Ok(Self::File(PathBuf::from(source)))
        }
    }

    pub fn extract(
        &self,
        output_dir: &Path,
        config: &ExtractConfig,
        progress: &mut dyn ProgressCallback,
    ) -> playbox_core::Result<ExtractionReport> {
        match self {
            Self::File(path) => extract_archive_with_progress(path, output_dir, config, progress),
            Self::Remote { bytes, .. } => extract_zip_with_progress(
                Cursor::new(bytes.as_slice()),
                bytes.len() as u64,
                output_dir,
                config,
                progress,
            ),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Remote { url, .. } => url.clone(),
        }
    }
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn download(url: &str) -> Result<Vec<u8>> {
    debug!(url, "downloading archive");
    let client = reqwest::blocking::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;

    let response = client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .with_context(|| format!("failed to download '{url}'"))?;
    let bytes = response
        .bytes()
        .with_context(|| format!("failed to read response body from '{url}'"))?;

    info!(url, bytes = bytes.len(), "archive downloaded");
    Ok(bytes.to_vec())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/go.zip"));
        assert!(is_url("http://localhost:8080/go.zip"));
        assert!(!is_url("go.zip"));
        assert!(!is_url("/srv/http://x.zip"));
    }

    #[test]
    fn test_local_source_is_not_fetched() {
        let source = ArchiveSource::resolve("archives/go.zip").unwrap();
        assert!(matches!(source, ArchiveSource::File(_)));
        assert_eq!(source.label(), "archives/go.zip");
    }
}
