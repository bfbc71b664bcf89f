//! Pipeline step commands: `init`, `build`, `run` and `fmt`.

use super::Session;
use crate::cli::Cli;
use crate::error::convert_run_error;
use crate::error::exit_code;
use crate::output::OutputFormatter;
use crate::output::StepResult;
use anyhow::Result;
use playbox_core::RunError;
use playbox_core::StreamTag;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Init,
    Build,
    Run { no_build: bool },
    Fmt,
}

impl Step {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Build => "build",
            Self::Run { .. } => "run",
            Self::Fmt => "fmt",
        }
    }
}

/// Runs `step` to completion and reports it.
///
/// Returns the process exit code: 0 on success, the failing child's code
/// when it has one, 1 otherwise.
pub fn execute(cli: &Cli, step: Step, formatter: &dyn OutputFormatter) -> Result<i32> {
    let session = Session::open(cli)?;
    let pipeline = session.pipeline();
    let start = Instant::now();

    let outcome: Result<Option<String>, RunError> = match step {
        Step::Init => pipeline.init().wait().map(|()| None),
        Step::Build => pipeline.build().wait().map(|()| None),
        Step::Run { no_build: false } => pipeline.build_then_run().wait().map(|()| None),
        Step::Run { no_build: true } => pipeline.run().wait().map(|()| None),
        Step::Fmt => pipeline.format_then_reload().wait().map(Some),
    };

    let mut result = StepResult {
        step: step.name().to_string(),
        duration_ms: start.elapsed().as_millis(),
        stdout: session.captured(StreamTag::Stdout),
        stderr: session.captured(StreamTag::Stderr),
        ..StepResult::default()
    };

    let code = match outcome {
        Ok(source) => {
            result.exit_code = Some(0);
            result.source = source;
            0
        }
        Err(e) => {
            result.exit_code = e.exit_code();
            let err = convert_run_error(e, step.name());
            result.error = Some(format!("{err:?}"));
            exit_code(&err)
        }
    };

    formatter.format_step_result(&result)?;
    Ok(code)
}
