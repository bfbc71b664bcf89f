//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use super::formatter::StepResult;
use anyhow::Result;
use playbox_core::ExtractionReport;
use serde::Serialize;
use std::io::Write;
use std::io::{self};

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

#[derive(Serialize)]
struct ExtractionOutput<'a> {
    source: &'a str,
    root: String,
    files_extracted: usize,
    directories_created: usize,
    bytes_written: u64,
    duration_ms: u128,
    top_level_entries: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    root_mode: Option<String>,
    warnings: &'a [String],
}

impl<'a> ExtractionOutput<'a> {
    fn new(source: &'a str, report: &'a ExtractionReport) -> Self {
        Self {
            source,
            root: report.root.display().to_string(),
            files_extracted: report.files_extracted,
            directories_created: report.directories_created,
            bytes_written: report.bytes_written,
            duration_ms: report.duration.as_millis(),
            top_level_entries: &report.top_level_entries,
            root_mode: report.root_mode_octal(),
            warnings: &report.warnings,
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_extraction_result(&self, source: &str, report: &ExtractionReport) -> Result<()> {
        let output = JsonOutput::success("bootstrap", ExtractionOutput::new(source, report));
        Self::output(&output)
    }

    fn format_step_result(&self, result: &StepResult) -> Result<()> {
        match &result.error {
            None => Self::output(&JsonOutput::success(result.step.clone(), result)),
            Some(error) => Self::output(&JsonOutput::failure(
                result.step.clone(),
                result,
                error.clone(),
            )),
        }
    }

    fn format_error(&self, error: &anyhow::Error) {
        let output = JsonOutput::<()>::error("unknown", format!("{error:?}"));
        let _ = Self::output(&output);
    }

    fn format_success(&self, operation: &str, message: &str) {
        #[derive(Serialize)]
        struct SuccessData {
            message: String,
        }

        let output = JsonOutput::success(
            operation,
            SuccessData {
                message: message.to_string(),
            },
        );
        let _ = Self::output(&output);
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData {
            message: String,
        }

        let output = JsonOutput::success(
            "warning",
            WarningData {
                message: message.to_string(),
            },
        );
        let _ = Self::output(&output);
    }
}
