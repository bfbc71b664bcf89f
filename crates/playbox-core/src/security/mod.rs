//! Security validation for archive extraction.

pub mod path;
pub mod permissions;
pub mod quota;

pub use path::PathGuard;
pub use path::validate_path;
pub use permissions::sanitize_mode;
pub use quota::QuotaTracker;
