//! Zip-slip safe toolchain extraction and a single-flight command pipeline.
//!
//! `playbox-core` unpacks a toolchain archive into a destination directory,
//! refusing any entry whose name would land outside it, and then drives a
//! playground workspace through build, run and format commands. Commands run
//! one at a time; their output streams to an [`Observer`], and dependent
//! steps are chained through [`CommandFuture`].
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use playbox_core::ExtractConfig;
//! use playbox_core::Pipeline;
//! use playbox_core::ToolchainConfig;
//! use playbox_core::extract_archive;
//! use playbox_core::sink::WriterObserver;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let report = extract_archive("go.zip", "/go", &ExtractConfig::default())?;
//! println!("Extracted {} files", report.files_extracted);
//!
//! let pipeline = Pipeline::new(
//!     ToolchainConfig::default(),
//!     Arc::new(WriterObserver::new(std::io::stdout())),
//! );
//! pipeline.init().wait()?;
//! pipeline.build_then_run().wait()?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod copy;
pub mod error;
pub mod formats;
pub mod future;
pub mod io;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod security;
pub mod sink;
#[cfg(any(test, feature = "test-utils"))]
#[doc(hidden)]
pub mod test_utils;
pub mod types;
pub mod workspace;

// Re-export main API types
pub use api::extract_archive;
pub use api::extract_archive_with_progress;
pub use api::extract_zip;
pub use api::extract_zip_with_progress;
pub use config::CommandSpec;
pub use config::ExtractConfig;
pub use config::ToolchainConfig;
pub use error::ExtractionError;
pub use error::QuotaResource;
pub use error::Result;
pub use error::RunError;
pub use future::CommandFuture;
pub use future::Elapsed;
pub use future::Panicked;
pub use future::Resolver;
pub use pipeline::Pipeline;
pub use pipeline::StepFuture;
pub use report::ExtractionReport;
pub use report::NoopProgress;
pub use report::ProgressCallback;
pub use runner::BusyGuard;
pub use runner::RunState;
pub use runner::SingleFlightRunner;
pub use sink::Observer;
pub use sink::OutputSink;
pub use sink::StreamTag;
pub use workspace::Workspace;

// Re-export types module for easier access
pub use security::PathGuard;
pub use security::validate_path;
pub use types::DestDir;
pub use types::SafePath;
