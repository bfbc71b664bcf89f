//! Single-flight process runner.
//!
//! At most one tracked command runs at a time per [`RunState`]. A second
//! request while one is in flight is rejected with [`RunError::Busy`]
//! instead of being queued.

use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::JoinHandle;

use tracing::debug;
use tracing::warn;

use crate::CommandSpec;
use crate::RunError;
use crate::sink::Observer;
use crate::sink::OutputSink;

/// Busy flag shared by everything that must not run concurrently.
#[derive(Debug, Default)]
pub struct RunState {
    busy: AtomicBool,
}

impl RunState {
    /// Creates an idle state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the state busy. Returns `true` only for the caller that flipped
    /// it from idle.
    pub fn try_acquire(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Marks the state idle, whatever it was.
    pub fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }

    /// Whether a command currently holds the state.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Proof that the caller holds the runner.
///
/// Dropping it hides the loading indicator and releases the [`RunState`].
#[must_use = "the runner is released as soon as the guard is dropped"]
pub struct BusyGuard {
    state: Arc<RunState>,
    observer: Arc<dyn Observer>,
}

impl std::fmt::Debug for BusyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusyGuard").finish_non_exhaustive()
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        // Releases even if the observer panics below.
        let _release = ReleaseOnDrop(&self.state);
        self.observer.set_busy(false);
    }
}

struct ReleaseOnDrop<'a>(&'a RunState);

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// Runs external commands one at a time, streaming their output to an
/// observer.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use playbox_core::CommandSpec;
/// use playbox_core::SingleFlightRunner;
/// use playbox_core::sink::WriterObserver;
///
/// let runner = SingleFlightRunner::new(Arc::new(WriterObserver::new(std::io::stdout())))
///     .with_working_dir("playground");
///
/// match runner.run(&CommandSpec::new("go", ["build", "-v", "."])) {
///     Ok(()) => println!("built"),
///     Err(e) if e.is_busy() => println!("already running"),
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
pub struct SingleFlightRunner {
    state: Arc<RunState>,
    observer: Arc<dyn Observer>,
    stdout: OutputSink,
    stderr: OutputSink,
    working_dir: Option<PathBuf>,
}

impl std::fmt::Debug for SingleFlightRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlightRunner")
            .field("state", &self.state)
            .field("working_dir", &self.working_dir)
            .finish_non_exhaustive()
    }
}

impl SingleFlightRunner {
    /// Creates an idle runner that reports to `observer`.
    pub fn new(observer: Arc<dyn Observer>) -> Self {
        let (stdout, stderr) = OutputSink::pair(&observer);
        Self {
            state: Arc::new(RunState::new()),
            observer,
            stdout,
            stderr,
            working_dir: None,
        }
    }

    /// Runs commands in `dir` instead of the current directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Directory commands run in, if set.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Sink for invocation lines and process stdout.
    #[must_use]
    pub fn stdout(&self) -> &OutputSink {
        &self.stdout
    }

    /// Sink for diagnostics and process stderr.
    #[must_use]
    pub fn stderr(&self) -> &OutputSink {
        &self.stderr
    }

    /// Whether a command is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    /// Claims the runner and switches the loading indicator on.
    ///
    /// Returns `None` if another caller holds it.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        if !self.state.try_acquire() {
            return None;
        }
        self.observer.set_busy(true);
        Some(BusyGuard {
            state: Arc::clone(&self.state),
            observer: Arc::clone(&self.observer),
        })
    }

    /// Runs `spec` to completion if the runner is idle.
    ///
    /// # Errors
    ///
    /// - `Busy` if another command is in flight; nothing is started or
    ///   written
    /// - `ProcessStart`, `ProcessExit` or `Wait` if the command fails, after
    ///   a diagnostic line has been written to the stderr sink
    pub fn run(&self, spec: &CommandSpec) -> Result<(), RunError> {
        let Some(guard) = self.try_acquire() else {
            debug!(command = %spec.program, "runner busy, command rejected");
            return Err(RunError::Busy);
        };
        self.run_acquired(guard, spec)
    }

    /// Runs `spec` under a guard obtained from [`try_acquire`](Self::try_acquire).
    ///
    /// The guard is released before this returns.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run), minus `Busy`.
    pub fn run_acquired(&self, guard: BusyGuard, spec: &CommandSpec) -> Result<(), RunError> {
        let result = self.execute(spec);
        if let Err(e) = &result {
            warn!(command = %spec.program, error = %e, "command failed");
        }
        drop(guard);
        result
    }

    fn execute(&self, spec: &CommandSpec) -> Result<(), RunError> {
        debug!(command = %spec.display_line(), dir = ?self.working_dir, "starting command");
        self.emit(&self.stdout, &format!("{}\n", spec.display_line()));

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(source) => {
                self.emit(
                    &self.stderr,
                    &format!("Failed to start process: {source}\n"),
                );
                return Err(RunError::ProcessStart {
                    program: spec.program.clone(),
                    source,
                });
            }
        };

        let mut pumps = Vec::with_capacity(2);
        let streams = [
            child.stdout.take().map(|s| pump(s, self.stdout.clone())),
            child.stderr.take().map(|s| pump(s, self.stderr.clone())),
        ];
        for spawned in streams.into_iter().flatten() {
            match spawned {
                Ok(handle) => pumps.push(handle),
                Err(e) => {
                    // Without a reader the child could block on a full pipe.
                    let _ = child.kill();
                    let _ = child.wait();
                    join_all(pumps);
                    self.emit(&self.stderr, &format!("Failed to read process output: {e}\n"));
                    return Err(RunError::Spawn(e));
                }
            }
        }

        let status = child.wait();
        join_all(pumps);

        match status {
            Ok(status) if status.success() => {
                debug!(command = %spec.program, "command finished");
                Ok(())
            }
            Ok(status) => {
                self.emit(&self.stderr, &format!("{}: {status}\n", spec.program));
                Err(RunError::ProcessExit {
                    program: spec.program.clone(),
                    status,
                })
            }
            Err(source) => {
                self.emit(
                    &self.stderr,
                    &format!("Failed to wait for process: {source}\n"),
                );
                Err(RunError::Wait {
                    program: spec.program.clone(),
                    source,
                })
            }
        }
    }

    fn emit(&self, sink: &OutputSink, text: &str) {
        if let Err(e) = sink.write_str(text) {
            warn!(stream = %sink.tag(), error = %e, "observer rejected output");
        }
    }
}

/// Copies `reader` line by line into `sink` on its own thread.
///
/// Keeps draining after the sink fails so the child never blocks on a full
/// pipe.
fn pump<R: Read + Send + 'static>(
    reader: R,
    mut sink: OutputSink,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("playbox-{}", sink.tag()))
        .spawn(move || {
            let mut reader = BufReader::new(reader);
            let mut line = Vec::new();
            let mut sink_ok = true;
            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        if sink_ok && let Err(e) = sink.write_all(&line) {
                            warn!(stream = %sink.tag(), error = %e, "dropping process output");
                            sink_ok = false;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        warn!(stream = %sink.tag(), error = %e, "process pipe read failed");
                        break;
                    }
                }
            }
        })
}

fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if handle.join().is_err() {
            warn!("output reader thread panicked");
        }
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sink::ObservedEvent;
    use crate::sink::RecordingObserver;
    use crate::sink::StreamTag;
    use std::time::Duration;
    use std::time::Instant;

    fn runner() -> (Arc<RecordingObserver>, SingleFlightRunner) {
        let recorder = Arc::new(RecordingObserver::new());
        let runner = SingleFlightRunner::new(recorder.clone());
        (recorder, runner)
    }

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh", ["-c", script])
    }

    #[test]
    fn test_run_state_cas() {
        let state = RunState::new();
        assert!(state.try_acquire());
        assert!(!state.try_acquire());
        assert!(state.is_busy());
        state.release();
        assert!(!state.is_busy());
        assert!(state.try_acquire());
    }

    #[test]
    fn test_run_streams_output() {
        let (recorder, runner) = runner();
        runner.run(&sh("echo out; echo err >&2")).unwrap();

        assert_eq!(
            recorder.output(StreamTag::Stdout),
            "$ sh -c echo out; echo err >&2\nout\n"
        );
        assert_eq!(recorder.output(StreamTag::Stderr), "err\n");
        assert_eq!(recorder.events().first(), Some(&ObservedEvent::Busy(true)));
        assert_eq!(recorder.events().last(), Some(&ObservedEvent::Busy(false)));
        assert!(!runner.is_busy());
    }

    #[test]
    fn test_nonzero_exit() {
        let (recorder, runner) = runner();
        let err = runner.run(&sh("exit 3")).unwrap_err();

        assert!(matches!(err, RunError::ProcessExit { .. }));
        assert_eq!(err.exit_code(), Some(3));
        assert!(recorder.output(StreamTag::Stderr).starts_with("sh: exit status"));
        assert!(!runner.is_busy());
    }

    #[test]
    fn test_start_failure() {
        let (recorder, runner) = runner();
        let err = runner
            .run(&CommandSpec::new("playbox-no-such-program", Vec::<String>::new()))
            .unwrap_err();

        assert!(matches!(err, RunError::ProcessStart { .. }));
        assert!(
            recorder
                .output(StreamTag::Stderr)
                .starts_with("Failed to start process: ")
        );
        assert!(runner.try_acquire().is_some());
    }

    #[test]
    fn test_busy_rejection_writes_nothing() {
        let (recorder, runner) = runner();
        let guard = runner.try_acquire().unwrap();
        let before = recorder.events().len();

        let err = runner.run(&sh("echo never")).unwrap_err();
        assert!(err.is_busy());
        assert_eq!(recorder.events().len(), before);

        drop(guard);
        assert!(runner.try_acquire().is_some());
    }

    #[test]
    fn test_concurrent_runs_single_flight() {
        let (recorder, runner) = runner();
        let runner = Arc::new(runner);

        let first = {
            let runner = Arc::clone(&runner);
            thread::spawn(move || runner.run(&sh("sleep 0.3")))
        };

        let start = Instant::now();
        while !runner.is_busy() {
            assert!(start.elapsed() < Duration::from_secs(5), "first run never started");
            thread::yield_now();
        }

        assert!(runner.run(&sh("echo second")).unwrap_err().is_busy());
        first.join().unwrap().unwrap();

        let stdout = recorder.output(StreamTag::Stdout);
        assert!(stdout.contains("$ sh -c sleep 0.3"));
        assert!(!stdout.contains("second"));
        assert!(runner.try_acquire().is_some());
    }

    #[test]
    fn test_working_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("marker"), b"").unwrap();
        let (recorder, runner) = runner();
        let runner = runner.with_working_dir(temp.path());

        runner.run(&sh("ls")).unwrap();
        assert!(recorder.output(StreamTag::Stdout).contains("marker"));
    }

    /// Panics when the loading indicator is switched off.
    struct PanickingObserver;

    impl Observer for PanickingObserver {
        fn set_busy(&self, busy: bool) {
            assert!(busy, "indicator failed to clear");
        }

        fn append(&self, _tag: StreamTag, _text: &str) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_observer_panic_still_releases() {
        let runner = Arc::new(SingleFlightRunner::new(Arc::new(PanickingObserver)));

        let handle = {
            let runner = Arc::clone(&runner);
            thread::spawn(move || runner.run(&sh("true")))
        };

        assert!(handle.join().is_err());
        assert!(!runner.is_busy());
    }
}
