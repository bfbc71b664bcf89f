//! Zip-slip guard for archive entry names.
//!
//! Validation is a pure path computation: no syscalls, no canonicalization.
//! An entry name is accepted only if the cleaned join of root and name keeps
//! the root (plus a separator) as a literal prefix, or is the root itself.

use std::ffi::OsString;
use std::path::Component;
use std::path::MAIN_SEPARATOR_STR;
use std::path::Path;
use std::path::PathBuf;

use crate::ExtractionError;
use crate::Result;
use crate::types::DestDir;
use crate::types::SafePath;

/// Cleans a path lexically.
///
/// Drops `.` components, folds `name/..` pairs and collapses repeated
/// separators. A `..` directly under the filesystem root is dropped; leading
/// `..` components of a relative path are kept. An empty result becomes `.`.
#[must_use]
pub fn clean_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            Component::RootDir | Component::Prefix(_) | Component::Normal(_) => {
                parts.push(component);
            }
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Validates entry names against one destination root.
///
/// The root prefix is computed once, so a guard can be reused for every
/// entry of an archive.
///
/// # Examples
///
/// ```no_run
/// use playbox_core::security::PathGuard;
/// use playbox_core::types::DestDir;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dest = DestDir::create("/tmp/go")?;
/// let guard = PathGuard::new(&dest);
///
/// let safe = guard.validate("bin/gofmt")?;
/// assert_eq!(safe.as_path(), std::path::Path::new("/tmp/go/bin/gofmt"));
///
/// assert!(guard.validate("../etc/passwd").is_err());
/// assert!(guard.validate("/etc/passwd").is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
    prefix: OsString,
}

impl PathGuard {
    /// Creates a guard for `dest`.
    #[must_use]
    pub fn new(dest: &DestDir) -> Self {
        Self::for_root(dest.as_path())
    }

    fn for_root(root: &Path) -> Self {
        let root = clean_path(root);
        let mut prefix = root.as_os_str().to_owned();
        if !prefix
            .as_encoded_bytes()
            .ends_with(MAIN_SEPARATOR_STR.as_bytes())
        {
            prefix.push(MAIN_SEPARATOR_STR);
        }
        Self { root, prefix }
    }

    /// Returns the cleaned root this guard checks against.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validates one entry name and returns its resolved path.
    ///
    /// # Errors
    ///
    /// - `ExtractionError::PathTraversal` for empty names, names with a `..`
    ///   segment, absolute or drive-prefixed names, and anything whose
    ///   cleaned join leaves the root
    /// - `ExtractionError::SecurityViolation` for names containing NUL bytes
    pub fn validate(&self, entry_name: &str) -> Result<SafePath> {
        if entry_name.contains('\0') {
            return Err(ExtractionError::SecurityViolation {
                reason: format!("entry name contains null bytes: {entry_name:?}"),
            });
        }

        let traversal = || ExtractionError::PathTraversal {
            path: PathBuf::from(entry_name),
        };

        if entry_name.is_empty() {
            return Err(traversal());
        }

        let mut relative = PathBuf::new();
        for component in Path::new(entry_name).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(traversal());
                }
            }
        }

        let resolved = clean_path(&self.root.join(&relative));
        if !self.contains(&resolved) {
            return Err(traversal());
        }

        Ok(SafePath::new(resolved, relative))
    }

    fn contains(&self, resolved: &Path) -> bool {
        if resolved == self.root {
            return true;
        }
        if self.root == Path::new(".") {
            return resolved.is_relative()
                && !matches!(resolved.components().next(), Some(Component::ParentDir));
        }
        resolved
            .as_os_str()
            .as_encoded_bytes()
            .starts_with(self.prefix.as_encoded_bytes())
    }
}

/// Validates `entry_name` against `dest`.
///
/// Convenience for a single check; build a [`PathGuard`] when validating a
/// whole archive.
///
/// # Errors
///
/// Same as [`PathGuard::validate`].
pub fn validate_path(entry_name: &str, dest: &DestDir) -> Result<SafePath> {
    PathGuard::new(dest).validate(entry_name)
}
