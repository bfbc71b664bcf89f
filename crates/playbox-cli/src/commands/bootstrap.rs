//! Bootstrap command implementation.

use crate::cli::BootstrapArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use crate::source::ArchiveSource;
use anyhow::Result;
use playbox_core::ExtractConfig;
use playbox_core::NoopProgress;

pub fn execute(
    args: &BootstrapArgs,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
) -> Result<()> {
    let defaults = ExtractConfig::default();
    let config = ExtractConfig {
        max_file_count: args.max_files.unwrap_or(defaults.max_file_count),
        max_total_size: args.max_total_size.unwrap_or(defaults.max_total_size),
        max_file_size: args.max_file_size.unwrap_or(defaults.max_file_size),
        cleanup_on_failure: args.cleanup_on_failure,
    };

    let source = ArchiveSource::resolve(&args.source)?;
    let label = source.label();

    // Use progress bar if TTY is detected (not quiet, not JSON, is terminal)
    let report = if show_progress && CliProgress::should_show() {
        let mut progress = CliProgress::new("Extracting");
        add_archive_context(
            source.extract(&args.output_dir, &config, &mut progress),
            &label,
        )?
    } else {
        let mut noop = NoopProgress;
        add_archive_context(source.extract(&args.output_dir, &config, &mut noop), &label)?
    };

    formatter.format_extraction_result(&label, &report)?;

    Ok(())
}
