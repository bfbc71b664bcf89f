//! Destination root for extraction.

use crate::ExtractionError;
use crate::Result;
use crate::security::path::clean_path;
use std::path::Path;
use std::path::PathBuf;

/// Directory permission applied when the root has to be created.
const ROOT_DIR_MODE: u32 = 0o750;

/// A destination root that exists on disk and is held in cleaned form.
///
/// The path is cleaned lexically (`.` dropped, `..` folded, separators
/// collapsed) rather than canonicalized, so a process-relative root stays
/// relative. Every [`SafePath`](super::SafePath) is checked against this
/// cleaned form.
///
/// # Examples
///
/// ```no_run
/// use playbox_core::types::DestDir;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dest = DestDir::create("/tmp/toolchain/./go")?;
/// assert_eq!(dest.as_path(), std::path::Path::new("/tmp/toolchain/go"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestDir(PathBuf);

impl DestDir {
    /// Creates the directory and its ancestors if absent.
    ///
    /// An existing directory is accepted as is; its permissions are not
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::Filesystem` if the directory cannot be
    /// created or the path exists and is not a directory.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let cleaned = clean_path(path.as_ref());

        let mut builder = std::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(ROOT_DIR_MODE);
        }
        #[cfg(not(unix))]
        let _ = ROOT_DIR_MODE;

        builder
            .create(&cleaned)
            .map_err(|e| ExtractionError::filesystem(&cleaned, e))?;

        Ok(Self(cleaned))
    }

    /// Returns the cleaned root path.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Converts into the inner `PathBuf`.
    #[inline]
    #[must_use]
    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_create_missing_ancestors() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let nested = temp.path().join("a").join("b").join("go");

        let dest = DestDir::create(&nested).expect("should create nested root");
        assert!(nested.is_dir());
        assert_eq!(dest.as_path(), nested.as_path());
    }

    #[test]
    fn test_create_existing_is_ok() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let first = DestDir::create(temp.path()).expect("should accept existing dir");
        let second = DestDir::create(temp.path()).expect("should accept existing dir");
        assert_eq!(first, second);
    }

    #[test]
    fn test_create_cleans_path() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let messy = temp.path().join("out").join(".").join("x").join("..");

        let dest = DestDir::create(&messy).expect("should create");
        assert_eq!(dest.as_path(), temp.path().join("out"));
    }

    #[test]
    fn test_create_over_file_fails() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let file_path = temp.path().join("file.txt");
        fs::write(&file_path, "test").expect("failed to write file");

        let result = DestDir::create(&file_path);
        assert!(matches!(result, Err(ExtractionError::Filesystem { .. })));
    }

    #[test]
    #[cfg(unix)]
    fn test_new_root_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().expect("failed to create temp dir");
        let root = temp.path().join("go");
        DestDir::create(&root).expect("should create");

        let mode = fs::metadata(&root).unwrap().permissions().mode() & 0o777;
        // umask may only clear bits
        assert_eq!(mode & !ROOT_DIR_MODE, 0);
    }

    #[test]
    fn test_into_path_buf() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let dest = DestDir::create(temp.path()).expect("should create");
        assert_eq!(dest.clone().into_path_buf(), dest.as_path());
    }
}
