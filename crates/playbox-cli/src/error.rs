//! Error conversion utilities for CLI.
//!
//! Converts playbox-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use playbox_core::ExtractionError;
use playbox_core::RunError;

/// Converts `ExtractionError` to user-friendly anyhow error with context
pub fn convert_extraction_error(err: ExtractionError, archive: &str) -> anyhow::Error {
    match err {
        ExtractionError::PathTraversal { path } => {
            anyhow!(
                "Security violation: Archive '{archive}' attempted path traversal with '{}'\n\
                 HINT: This archive may be malicious. Do not extract from untrusted sources.",
                path.display()
            )
        }
        ExtractionError::SecurityViolation { reason } => {
            anyhow!(
                "Security violation in '{archive}': {reason}\n\
                 HINT: This archive may be malicious. Do not extract from untrusted sources."
            )
        }
        ExtractionError::QuotaExceeded { resource } => {
            anyhow!(
                "Extraction limit exceeded for '{archive}': {resource}\n\
                 HINT: Use --max-files, --max-total-size, or --max-file-size to increase limits."
            )
        }
        ExtractionError::Io(io_err) => {
            anyhow!("I/O error while processing '{archive}': {io_err}")
        }
        ExtractionError::ArchiveFormat(reason) => {
            anyhow!(
                "Invalid archive '{archive}': {reason}\n\
                 HINT: The archive may be corrupted, truncated, or not a zip file."
            )
        }
        ExtractionError::Filesystem { path, source } => {
            anyhow!(
                "Cannot write '{}' while extracting '{archive}': {source}\n\
                 HINT: Check permissions and free space in the output directory.",
                path.display()
            )
        }
    }
}

/// Adds context to a generic error about archive operations
pub fn add_archive_context<T>(
    result: Result<T, ExtractionError>,
    archive: &str,
) -> anyhow::Result<T> {
    result.map_err(|e| convert_extraction_error(e, archive))
}

/// Converts `RunError` to an anyhow error with guidance.
///
/// The `RunError` stays in the chain so callers can recover the exit
/// code with `downcast_ref::<RunError>()`.
pub fn convert_run_error(err: RunError, step: &str) -> anyhow::Error {
    let message = match &err {
        RunError::Busy => format!(
            "Cannot {step}: another command is still running\n\
             HINT: Wait for it to finish and try again."
        ),
        RunError::ProcessStart { program, .. } => format!(
            "Cannot {step}: '{program}' could not be started\n\
             HINT: Make sure the toolchain is installed and on PATH (see `playbox bootstrap`)."
        ),
        RunError::ProcessExit { program, status } => {
            format!("Cannot {step}: '{program}' exited unsuccessfully ({status})")
        }
        RunError::Wait { program, .. } => {
            format!("Cannot {step}: lost track of '{program}'")
        }
        RunError::Filesystem { path, .. } => format!(
            "Cannot {step}: '{}' is not accessible\n\
             HINT: Run `playbox init` to create the playground.",
            path.display()
        ),
        RunError::Timeout { after } => format!(
            "Cannot {step}: still running after {}s\n\
             HINT: Raise step_timeout_secs in the configuration file.",
            after.as_secs()
        ),
        RunError::Spawn(_) => format!("Cannot {step}: failed to start a worker thread"),
        RunError::Panicked(_) => format!("Cannot {step}: the step worker crashed"),
    };
    anyhow::Error::new(err).context(message)
}

/// Exit code for a failed invocation: the child's own code when a step
/// exited non-zero, otherwise 1.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<RunError>()
        .and_then(RunError::exit_code)
        .filter(|code| *code != 0)
        .unwrap_or(1)
}
