//! Extraction quota tracking and validation.

use crate::ExtractConfig;
use crate::ExtractionError;
use crate::Result;
use crate::error::QuotaResource;

/// Tracks resource usage during one extraction.
#[derive(Debug, Default)]
pub struct QuotaTracker {
    files_extracted: usize,
    bytes_written: u64,
}

impl QuotaTracker {
    /// Creates a new quota tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one more file against `max_file_count`.
    ///
    /// # Errors
    ///
    /// Returns `QuotaExceeded` once the count goes over the limit.
    pub fn start_file(&mut self, config: &ExtractConfig) -> Result<()> {
        self.files_extracted += 1;
        if self.files_extracted > config.max_file_count {
            return Err(ExtractionError::QuotaExceeded {
                resource: QuotaResource::FileCount {
                    current: self.files_extracted,
                    max: config.max_file_count,
                },
            });
        }
        Ok(())
    }

    /// Returns how many more bytes the current file may receive, given the
    /// per-file and total limits.
    #[must_use]
    pub fn remaining_for_file(&self, config: &ExtractConfig) -> u64 {
        let total_left = config.max_total_size.saturating_sub(self.bytes_written);
        total_left.min(config.max_file_size)
    }

    /// Adds `size` bytes of the file just written.
    ///
    /// # Errors
    ///
    /// Returns `QuotaExceeded` if the file or the running total is over its
    /// limit, or on integer overflow.
    pub fn record_bytes(&mut self, size: u64, config: &ExtractConfig) -> Result<()> {
        if size > config.max_file_size {
            return Err(ExtractionError::QuotaExceeded {
                resource: QuotaResource::FileSize {
                    size,
                    max: config.max_file_size,
                },
            });
        }

        self.bytes_written =
            self.bytes_written
                .checked_add(size)
                .ok_or(ExtractionError::QuotaExceeded {
                    resource: QuotaResource::IntegerOverflow,
                })?;

        if self.bytes_written > config.max_total_size {
            return Err(ExtractionError::QuotaExceeded {
                resource: QuotaResource::TotalSize {
                    current: self.bytes_written,
                    max: config.max_total_size,
                },
            });
        }

        Ok(())
    }

    /// Returns the number of files counted so far.
    #[must_use]
    pub fn files_extracted(&self) -> usize {
        self.files_extracted
    }

    /// Returns the total bytes recorded so far.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}
