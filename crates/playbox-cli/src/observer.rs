//! Terminal observer for command output.
//!
//! Stdout chunks go to the terminal's stdout as is; stderr chunks go to
//! stderr, in red when colors are enabled. While a command runs, an
//! `indicatif` spinner on stderr serves as the loading indicator.

use console::Term;
use console::style;
use indicatif::ProgressBar;
use indicatif::ProgressStyle;
use playbox_core::Observer;
use playbox_core::StreamTag;
use std::io;
use std::io::Write;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

pub struct ConsoleObserver {
    quiet: bool,
    use_colors: bool,
    show_spinner: bool,
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleObserver {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            use_colors: console::colors_enabled_stderr(),
            show_spinner: !quiet && Term::stderr().is_term(),
            spinner: Mutex::new(None),
        }
    }

    fn write(tag: StreamTag, text: &str, use_colors: bool) -> io::Result<()> {
        match tag {
            StreamTag::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(text.as_bytes())?;
                out.flush()
            }
            StreamTag::Stderr => {
                let mut err = io::stderr().lock();
                if use_colors {
                    write!(err, "{}", style(text).red())?;
                } else {
                    err.write_all(text.as_bytes())?;
                }
                err.flush()
            }
        }
    }
}

impl Observer for ConsoleObserver {
    fn set_busy(&self, busy: bool) {
        if !self.show_spinner {
            return;
        }

        let mut spinner = self.spinner.lock().unwrap_or_else(PoisonError::into_inner);
        if busy {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.set_message("running");
            bar.enable_steady_tick(Duration::from_millis(100));
            *spinner = Some(bar);
        } else if let Some(bar) = spinner.take() {
            bar.finish_and_clear();
        }
    }

    fn append(&self, tag: StreamTag, text: &str) -> io::Result<()> {
        if self.quiet && tag == StreamTag::Stdout {
            return Ok(());
        }

        let spinner = self.spinner.lock().unwrap_or_else(PoisonError::into_inner);
        match spinner.as_ref() {
            Some(bar) => bar.suspend(|| Self::write(tag, text, self.use_colors)),
            None => Self::write(tag, text, self.use_colors),
        }
    }
}
