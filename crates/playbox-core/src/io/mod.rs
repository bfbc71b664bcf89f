//! I/O adapters for archive sources.

pub mod sized;

pub use sized::SizedSource;
