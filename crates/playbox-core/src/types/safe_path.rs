//! Validated resolved path type for archive extraction.

use crate::Result;
use std::path::Path;
use std::path::PathBuf;

use super::DestDir;

/// An entry path that has passed the zip-slip guard.
///
/// Holds the cleaned join of the destination root and the entry name, which
/// is either the root itself or a descendant of it.
///
/// # Security Properties
///
/// - Can ONLY be constructed through validation
/// - NO `From<PathBuf>` implementation (security critical)
/// - Always resolves within the destination root
///
/// # Examples
///
/// ```no_run
/// use playbox_core::types::DestDir;
/// use playbox_core::types::SafePath;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dest = DestDir::create("/tmp/go")?;
///
/// let safe = SafePath::validate("src/fmt/print.go", &dest)?;
/// assert!(safe.as_path().starts_with(dest.as_path()));
///
/// assert!(SafePath::validate("../etc/passwd", &dest).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafePath {
    resolved: PathBuf,
    relative: PathBuf,
}

impl SafePath {
    /// Validates `entry_name` against `dest` and constructs a `SafePath`.
    ///
    /// # Errors
    ///
    /// See [`PathGuard::validate`](crate::security::PathGuard::validate).
    pub fn validate(entry_name: &str, dest: &DestDir) -> Result<Self> {
        crate::security::path::validate_path(entry_name, dest)
    }

    pub(crate) fn new(resolved: PathBuf, relative: PathBuf) -> Self {
        Self { resolved, relative }
    }

    /// Returns the resolved path (root joined with the entry name).
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.resolved
    }

    /// Returns the normalized entry path relative to the root. Empty for the
    /// root itself.
    #[inline]
    #[must_use]
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    /// Returns `true` when this path is the destination root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.relative.as_os_str().is_empty()
    }

    /// Converts into the resolved `PathBuf`.
    #[inline]
    #[must_use]
    pub fn into_path_buf(self) -> PathBuf {
        self.resolved
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ExtractionError;
    use tempfile::TempDir;

    fn create_test_dest() -> (TempDir, DestDir) {
        let temp = TempDir::new().expect("failed to create temp dir");
        let dest = DestDir::create(temp.path()).expect("failed to create dest");
        (temp, dest)
    }

    #[test]
    fn test_safe_path_valid_relative() {
        let (_temp, dest) = create_test_dest();
        let safe = SafePath::validate("foo/bar/baz.txt", &dest).expect("should be valid");
        assert_eq!(safe.as_path(), dest.as_path().join("foo/bar/baz.txt"));
        assert!(!safe.is_root());
    }

    #[test]
    fn test_safe_path_reject_parent_traversal() {
        let (_temp, dest) = create_test_dest();
        for name in ["../etc/passwd", "foo/../../etc/passwd"] {
            let result = SafePath::validate(name, &dest);
            assert!(
                matches!(result, Err(ExtractionError::PathTraversal { .. })),
                "path should be rejected: {name}"
            );
        }
    }

    #[test]
    fn test_safe_path_root() {
        let (_temp, dest) = create_test_dest();
        let safe = SafePath::validate(".", &dest).expect("root should be valid");
        assert!(safe.is_root());
        assert_eq!(safe.as_path(), dest.as_path());
    }

    #[test]
    fn test_safe_path_unicode() {
        let (_temp, dest) = create_test_dest();
        assert!(SafePath::validate("folder/📁test.txt", &dest).is_ok());
        assert!(SafePath::validate("café", &dest).is_ok());
    }

    #[test]
    fn test_safe_path_equality() {
        let (_temp, dest) = create_test_dest();
        let a = SafePath::validate("foo/bar.txt", &dest).expect("should be valid");
        let b = SafePath::validate("./foo/bar.txt", &dest).expect("should be valid");
        assert_eq!(a, b);
    }
}
