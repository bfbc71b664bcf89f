//! Edit command implementation.

use super::Session;
use crate::cli::Cli;
use crate::cli::EditArgs;
use crate::error::convert_run_error;
use crate::output::OutputFormatter;
use anyhow::Context;
use anyhow::Result;
use std::io;
use std::io::Read;

/// Replaces the tracked source file with FILE, or with stdin when no file
/// is given.
pub fn execute(cli: &Cli, args: &EditArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let text = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read source from stdin")?;
            buf
        }
    };

    let session = Session::open(cli)?;
    let pipeline = session.pipeline();
    pipeline
        .edited(|| text)
        .map_err(|e| convert_run_error(e, "edit"))?;

    formatter.format_success(
        "edit",
        &format!("Saved {}", pipeline.workspace().main_path().display()),
    );
    Ok(())
}
