//! Permission bits applied to extracted entries.

/// Mode for directories whose entry carries no Unix mode.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Mode for files whose entry carries no Unix mode.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

const PERMISSION_BITS: u32 = 0o777;
const FILE_TYPE_MASK: u32 = 0o170_000;
const SYMLINK_TYPE: u32 = 0o120_000;

/// Reduces a stored Unix mode to the permission bits that get applied.
///
/// File type bits and setuid/setgid/sticky are dropped. Entries without a
/// stored mode (archives written on non-Unix hosts) get the defaults.
#[must_use]
pub fn sanitize_mode(stored: Option<u32>, is_dir: bool) -> u32 {
    match stored {
        Some(mode) => mode & PERMISSION_BITS,
        None if is_dir => DEFAULT_DIR_MODE,
        None => DEFAULT_FILE_MODE,
    }
}

/// Returns `true` when the stored mode describes a symbolic link.
#[must_use]
pub fn is_symlink_mode(stored: Option<u32>) -> bool {
    stored.is_some_and(|mode| mode & FILE_TYPE_MASK == SYMLINK_TYPE)
}
