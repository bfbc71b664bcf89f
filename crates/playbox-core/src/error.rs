//! Error types for toolchain extraction and command execution.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using `ExtractionError`.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Represents a specific quota resource that was exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaResource {
    /// File count quota exceeded.
    FileCount {
        /// Current file count.
        current: usize,
        /// Maximum allowed file count.
        max: usize,
    },
    /// Total size quota exceeded.
    TotalSize {
        /// Current total size in bytes.
        current: u64,
        /// Maximum allowed total size in bytes.
        max: u64,
    },
    /// Single file size quota exceeded.
    FileSize {
        /// File size in bytes.
        size: u64,
        /// Maximum allowed file size in bytes.
        max: u64,
    },
    /// Integer overflow detected in quota tracking.
    IntegerOverflow,
}

impl std::fmt::Display for QuotaResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileCount { current, max } => {
                write!(f, "quota exceeded: file count ({current} > {max})")
            }
            Self::TotalSize { current, max } => {
                write!(f, "quota exceeded: total size ({current} > {max})")
            }
            Self::FileSize { size, max } => {
                write!(f, "quota exceeded: single file size ({size} > {max})")
            }
            Self::IntegerOverflow => {
                write!(f, "quota exceeded: integer overflow in quota tracking")
            }
        }
    }
}

/// Errors that can occur while materializing a toolchain archive.
///
/// Every variant is fatal to the extraction that produced it. Files already
/// written are left in place unless
/// [`ExtractConfig::cleanup_on_failure`](crate::ExtractConfig::cleanup_on_failure)
/// is set.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Reading the archive source failed outside of entry handling.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The zip trailer, central directory or an entry stream is corrupt.
    #[error("invalid archive: {0}")]
    ArchiveFormat(String),

    /// An entry name resolves outside the destination root.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The entry name as stored in the archive.
        path: PathBuf,
    },

    /// Creating a directory or writing a file under the root failed.
    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        /// The path being created or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Extraction quota exceeded.
    #[error("{resource}")]
    QuotaExceeded {
        /// Description of the exceeded resource.
        resource: QuotaResource,
    },

    /// Entry rejected by a rule other than traversal.
    #[error("operation denied by security policy: {reason}")]
    SecurityViolation {
        /// Reason for the violation.
        reason: String,
    },
}

impl ExtractionError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if this error was raised by a security check rather
    /// than by a broken archive or filesystem.
    ///
    /// # Examples
    ///
    /// ```
    /// use playbox_core::ExtractionError;
    /// use std::path::PathBuf;
    ///
    /// let err = ExtractionError::PathTraversal {
    ///     path: PathBuf::from("../evil"),
    /// };
    /// assert!(err.is_security_violation());
    ///
    /// let err = ExtractionError::ArchiveFormat("bad trailer".into());
    /// assert!(!err.is_security_violation());
    /// ```
    #[must_use]
    pub const fn is_security_violation(&self) -> bool {
        matches!(
            self,
            Self::PathTraversal { .. }
                | Self::QuotaExceeded { .. }
                | Self::SecurityViolation { .. }
        )
    }

    /// Returns a context string for this error, if available.
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::ArchiveFormat(msg) => Some(msg),
            Self::SecurityViolation { reason } => Some(reason),
            _ => None,
        }
    }

    /// Returns the quota resource that was exceeded, if applicable.
    #[must_use]
    pub const fn quota_resource(&self) -> Option<&QuotaResource> {
        match self {
            Self::QuotaExceeded { resource } => Some(resource),
            _ => None,
        }
    }
}

impl From<zip::result::ZipError> for ExtractionError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::ArchiveFormat(err.to_string())
    }
}

/// Errors surfaced by the runner and the pipeline built on top of it.
#[derive(Error, Debug)]
pub enum RunError {
    /// Another tracked command is in flight. This is an expected rejection,
    /// not a command failure.
    #[error("runner is busy with another command")]
    Busy,

    /// The process could not be started.
    #[error("failed to start process {program}: {source}")]
    ProcessStart {
        /// Program name as configured.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited unsuccessfully.
    #[error("{program} failed: {status}")]
    ProcessExit {
        /// Program name as configured.
        program: String,
        /// Exit status reported by the OS.
        status: ExitStatus,
    },

    /// Waiting for the process failed.
    #[error("failed to wait for {program}: {source}")]
    Wait {
        /// Program name as configured.
        program: String,
        /// Underlying wait error.
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing a workspace file failed.
    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        /// File being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A step did not settle before its deadline.
    #[error("step timed out after {after:?}")]
    Timeout {
        /// The deadline that elapsed.
        after: Duration,
    },

    /// The worker thread for a step could not be created.
    #[error("failed to schedule step: {0}")]
    Spawn(#[source] std::io::Error),

    /// The worker thread for a step panicked before settling.
    #[error(transparent)]
    Panicked(#[from] crate::future::Panicked),
}

impl RunError {
    /// Returns `true` for the single-flight rejection.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }

    /// Returns the exit code when the process ran and exited non-zero.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ProcessExit { status, .. } => status.code(),
            _ => None,
        }
    }
}

impl From<crate::future::Elapsed> for RunError {
    fn from(elapsed: crate::future::Elapsed) -> Self {
        Self::Timeout {
            after: elapsed.after(),
        }
    }
}

impl From<std::io::Error> for RunError {
    fn from(err: std::io::Error) -> Self {
        Self::Spawn(err)
    }
}
