//! Type-safe wrappers for extraction paths.
//!
//! `SafePath` values can only be produced by the path guard, so any function
//! taking one is known to write inside the destination root.

pub mod dest_dir;
pub mod safe_path;

pub use dest_dir::DestDir;
pub use safe_path::SafePath;
