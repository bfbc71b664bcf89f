//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use super::formatter::StepResult;
use crate::progress::humanize_bytes;
use anyhow::Result;
use console::Term;
use console::style;
use playbox_core::ExtractionReport;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
    err: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
            err: Term::stderr(),
        }
    }

    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        let mut count = 0;

        for c in s.chars().rev() {
            if count == 3 {
                result.push(',');
                count = 0;
            }
            result.push(c);
            count += 1;
        }

        result.chars().rev().collect()
    }

    fn tick(&self, message: &str) -> String {
        if self.use_colors {
            format!("{} {message}", style("✓").green().bold())
        } else {
            message.to_string()
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_extraction_result(&self, source: &str, report: &ExtractionReport) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let _ = self
            .term
            .write_line(&self.tick(&format!("Unpacked {source}")));
        let _ = self
            .term
            .write_line(&format!("  Destination: {}", report.root.display()));
        let _ = self.term.write_line(&format!(
            "  Files extracted: {}",
            Self::format_number(report.files_extracted)
        ));
        let _ = self.term.write_line(&format!(
            "  Directories: {}",
            Self::format_number(report.directories_created)
        ));
        let _ = self.term.write_line(&format!(
            "  Total size: {}",
            humanize_bytes(report.bytes_written)
        ));
        if let Some(mode) = report.root_mode_octal() {
            let _ = self.term.write_line(&format!("  Dir perm: {mode}"));
        }

        if !report.top_level_entries.is_empty() {
            let _ = self.term.write_line("  Contents:");
            for name in &report.top_level_entries {
                let _ = self.term.write_line(&format!("    {name}"));
            }
        }

        if self.verbose {
            let _ = self
                .term
                .write_line(&format!("  Duration: {:?}", report.duration));
        }

        if report.has_warnings() {
            for warning in &report.warnings {
                self.format_warning(warning);
            }
        }

        Ok(())
    }

    fn format_step_result(&self, result: &StepResult) -> Result<()> {
        if let Some(error) = &result.error {
            // Always show errors, even in quiet mode
            if self.use_colors {
                let _ = self
                    .err
                    .write_line(&format!("{} {error}", style("ERROR:").red().bold()));
            } else {
                let _ = self.err.write_line(&format!("ERROR: {error}"));
            }
            return Ok(());
        }

        if let Some(source) = &result.source {
            let _ = self.term.write_str(source);
        }

        if self.quiet {
            return Ok(());
        }

        let mut message = format!("{} finished", result.step);
        if self.verbose {
            message.push_str(&format!(" in {}ms", result.duration_ms));
        }
        let _ = self.err.write_line(&self.tick(&message));
        Ok(())
    }

    fn format_error(&self, error: &anyhow::Error) {
        // Always show errors, even in quiet mode
        if self.use_colors {
            let _ = self
                .err
                .write_line(&format!("{} {error:?}", style("ERROR:").red().bold()));
        } else {
            let _ = self.err.write_line(&format!("ERROR: {error:?}"));
        }
    }

    fn format_success(&self, _operation: &str, message: &str) {
        if self.quiet {
            return;
        }

        let _ = self.term.write_line(&self.tick(message));
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            let _ = self
                .err
                .write_line(&format!("{} {message}", style("⚠").yellow().bold()));
        } else {
            let _ = self.err.write_line(&format!("WARNING: {message}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(HumanFormatter::format_number(0), "0");
        assert_eq!(HumanFormatter::format_number(999), "999");
        assert_eq!(HumanFormatter::format_number(1000), "1,000");
        assert_eq!(HumanFormatter::format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn test_tick_without_colors() {
        let formatter = HumanFormatter {
            verbose: false,
            quiet: false,
            use_colors: false,
            term: Term::stdout(),
            err: Term::stderr(),
        };
        assert_eq!(formatter.tick("done"), "done");
    }
}
