//! Named playground workflows built from runner steps.
//!
//! Every operation returns a [`CommandFuture`] immediately; the command runs
//! on a step thread. Dependent steps are chained with `then`, so a failed
//! build never starts the run step.

use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use crate::CommandSpec;
use crate::RunError;
use crate::ToolchainConfig;
use crate::future::CommandFuture;
use crate::runner::SingleFlightRunner;
use crate::sink::Observer;
use crate::sink::OutputSink;
use crate::workspace::Workspace;

/// Future returned by pipeline steps.
pub type StepFuture<T = ()> = CommandFuture<T, RunError>;

/// Playground workflows over one runner and one workspace.
///
/// Cloning is cheap; clones share the runner, so they are single-flight
/// with respect to each other.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use playbox_core::Pipeline;
/// use playbox_core::ToolchainConfig;
/// use playbox_core::sink::WriterObserver;
///
/// let observer = Arc::new(WriterObserver::new(std::io::stdout()));
/// let pipeline = Pipeline::new(ToolchainConfig::default(), observer);
///
/// pipeline.init().wait()?;
/// pipeline.build_then_run().wait()?;
/// # Ok::<(), playbox_core::RunError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    runner: Arc<SingleFlightRunner>,
    workspace: Workspace,
    toolchain: ToolchainConfig,
}

impl Pipeline {
    /// Creates a pipeline whose commands run inside the configured
    /// workspace directory.
    pub fn new(toolchain: ToolchainConfig, observer: Arc<dyn Observer>) -> Self {
        let runner = SingleFlightRunner::new(observer).with_working_dir(&toolchain.workspace_dir);
        Self {
            runner: Arc::new(runner),
            workspace: Workspace::from_config(&toolchain),
            toolchain,
        }
    }

    /// The shared runner.
    #[must_use]
    pub fn runner(&self) -> &SingleFlightRunner {
        &self.runner
    }

    /// The playground workspace.
    #[must_use]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// The commands this pipeline runs.
    #[must_use]
    pub fn toolchain(&self) -> &ToolchainConfig {
        &self.toolchain
    }

    /// Creates the workspace and starter source, then runs the `init`
    /// command unless the file it creates is already present.
    ///
    /// A failed `init` leaves no such file, so calling `init` again retries
    /// the command.
    pub fn init(&self) -> StepFuture {
        let created = match self.workspace.create() {
            Ok(created) => created,
            Err(e) => return self.fail("Failed to make playground dir", e),
        };
        if let Err(e) = self.workspace.write_starter() {
            return self.fail("Failed to write starter source", e);
        }

        match &self.toolchain.init {
            Some(init) if self.toolchain.needs_init() => self.run_step(init),
            _ => {
                debug!(created, "workspace already initialized");
                CommandFuture::resolved(())
            }
        }
    }

    /// Runs the build command.
    pub fn build(&self) -> StepFuture {
        self.run_step(&self.toolchain.build)
    }

    /// Runs the run command.
    pub fn run(&self) -> StepFuture {
        self.run_step(&self.toolchain.run)
    }

    /// Builds, then runs only if the build succeeded.
    pub fn build_then_run(&self) -> StepFuture {
        let this = self.clone();
        self.build().then(move |()| this.run())
    }

    /// Runs the format command.
    pub fn format(&self) -> StepFuture {
        self.run_step(&self.toolchain.format)
    }

    /// Formats, then resolves with the reloaded source text.
    pub fn format_then_reload(&self) -> StepFuture<String> {
        let workspace = self.workspace.clone();
        let stderr = self.runner.stderr().clone();
        self.format()
            .then(move |()| match workspace.read_main() {
                Ok(text) => CommandFuture::resolved(text),
                Err(e) => {
                    report(&stderr, "Failed to reload source", &e);
                    CommandFuture::rejected(e)
                }
            })
    }

    /// Saves the text produced by `content` as the tracked source file.
    ///
    /// # Errors
    ///
    /// Returns `Filesystem` if the file cannot be written; a diagnostic line
    /// is written to the stderr sink first.
    pub fn edited<F>(&self, content: F) -> Result<(), RunError>
    where
        F: FnOnce() -> String,
    {
        self.workspace.write_main(&content()).inspect_err(|e| {
            warn!(path = %self.workspace.main_path().display(), error = %e, "failed to save source");
            report(self.runner.stderr(), "Failed to save source", e);
        })
    }

    /// Runs `spec` on a step thread, under the configured deadline.
    ///
    /// Resolves to `Busy` right away if another step holds the runner.
    pub fn run_step(&self, spec: &CommandSpec) -> StepFuture {
        let Some(guard) = self.runner.try_acquire() else {
            debug!(command = %spec.program, "runner busy, step rejected");
            return CommandFuture::rejected(RunError::Busy);
        };

        let runner = Arc::clone(&self.runner);
        let step = spec.clone();
        let future = CommandFuture::spawn(move || runner.run_acquired(guard, &step));
        let future = match self.toolchain.step_timeout() {
            Some(deadline) => future.with_deadline(deadline),
            None => future,
        };

        // Failures that never reached the child process still land on stderr.
        let stderr = self.runner.stderr().clone();
        let (resolver, reported) = CommandFuture::new();
        future.on_settle(move |result| {
            match &result {
                Err(e @ RunError::Timeout { .. }) => report(&stderr, "Step abandoned", e),
                Err(e @ (RunError::Spawn(_) | RunError::Panicked(_))) => {
                    warn!(error = %e, "step worker failed");
                    report(&stderr, "Step failed", e);
                }
                _ => {}
            }
            resolver.settle(result);
        });
        reported
    }

    fn fail<T: Send + 'static>(&self, what: &str, error: RunError) -> StepFuture<T> {
        warn!(error = %error, "{what}");
        report(self.runner.stderr(), what, &error);
        CommandFuture::rejected(error)
    }
}

fn report(stderr: &OutputSink, what: &str, error: &RunError) {
    if let Err(e) = stderr.write_str(&format!("{what}: {error}\n")) {
        warn!(error = %e, "observer rejected diagnostic");
    }
}
