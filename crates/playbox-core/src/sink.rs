//! Tagged output sinks and the observer that renders them.
//!
//! A runner writes command output through two [`OutputSink`]s, one per
//! stream, which share a single [`Observer`]. Each write reaches the
//! observer as one append.

use std::fmt;
use std::io;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

/// Which process stream a chunk of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamTag {
    /// Standard output, plus invocation lines.
    Stdout,
    /// Standard error, plus diagnostic lines.
    Stderr,
}

impl fmt::Display for StreamTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// Receives command output and the loading indicator state.
pub trait Observer: Send + Sync {
    /// Shows or hides the loading indicator.
    fn set_busy(&self, busy: bool);

    /// Appends one chunk of text from `tag`'s stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the observer can no longer accept output.
    fn append(&self, tag: StreamTag, text: &str) -> io::Result<()>;
}

/// Append-only writer for one stream.
///
/// Bytes that are not valid UTF-8 are replaced before reaching the
/// observer. Nothing is buffered: every `write` is forwarded immediately.
#[derive(Clone)]
pub struct OutputSink {
    observer: Arc<dyn Observer>,
    tag: StreamTag,
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSink").field("tag", &self.tag).finish()
    }
}

impl OutputSink {
    /// Creates a sink that appends to `observer` under `tag`.
    pub fn new(observer: Arc<dyn Observer>, tag: StreamTag) -> Self {
        Self { observer, tag }
    }

    /// Stdout and stderr sinks sharing `observer`.
    pub fn pair(observer: &Arc<dyn Observer>) -> (Self, Self) {
        (
            Self::new(Arc::clone(observer), StreamTag::Stdout),
            Self::new(Arc::clone(observer), StreamTag::Stderr),
        )
    }

    /// The stream this sink writes to.
    #[must_use]
    pub fn tag(&self) -> StreamTag {
        self.tag
    }

    /// Appends `text` as one chunk.
    ///
    /// # Errors
    ///
    /// Propagates the observer's error.
    pub fn write_str(&self, text: &str) -> io::Result<()> {
        self.observer.append(self.tag, text)
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_str(&String::from_utf8_lossy(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Something an observer saw, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedEvent {
    /// Loading indicator toggled.
    Busy(bool),
    /// Output appended.
    Output(StreamTag, String),
}

/// In-memory observer that records every event.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObservedEvent>>,
}

impl RecordingObserver {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events so far.
    #[must_use]
    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Concatenated output of one stream.
    #[must_use]
    pub fn output(&self, tag: StreamTag) -> String {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::Output(t, text) if t == tag => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Whether the last indicator change switched it on.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.events()
            .iter()
            .rev()
            .find_map(|event| match event {
                ObservedEvent::Busy(busy) => Some(*busy),
                ObservedEvent::Output(..) => None,
            })
            .unwrap_or(false)
    }
}

impl Observer for RecordingObserver {
    fn set_busy(&self, busy: bool) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ObservedEvent::Busy(busy));
    }

    fn append(&self, tag: StreamTag, text: &str) -> io::Result<()> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ObservedEvent::Output(tag, text.to_string()));
        Ok(())
    }
}

/// Observer that writes both streams, untagged, to one writer.
///
/// The loading indicator is ignored.
#[derive(Debug)]
pub struct WriterObserver<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterObserver<W> {
    /// Wraps `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> Observer for WriterObserver<W> {
    fn set_busy(&self, _busy: bool) {}

    fn append(&self, _tag: StreamTag, text: &str) -> io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(text.as_bytes())?;
        writer.flush()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sinks_share_observer_in_order() {
        let recorder = Arc::new(RecordingObserver::new());
        let observer: Arc<dyn Observer> = recorder.clone();
        let (mut out, err) = OutputSink::pair(&observer);

        out.write_all(b"$ go build\n").unwrap();
        err.write_str("main.go:3: undefined: x\n").unwrap();
        out.write_str("done\n").unwrap();

        assert_eq!(
            recorder.events(),
            vec![
                ObservedEvent::Output(StreamTag::Stdout, "$ go build\n".into()),
                ObservedEvent::Output(StreamTag::Stderr, "main.go:3: undefined: x\n".into()),
                ObservedEvent::Output(StreamTag::Stdout, "done\n".into()),
            ]
        );
        assert_eq!(recorder.output(StreamTag::Stdout), "$ go build\ndone\n");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let recorder = Arc::new(RecordingObserver::new());
        let observer: Arc<dyn Observer> = recorder.clone();
        let mut sink = OutputSink::new(observer, StreamTag::Stdout);

        assert_eq!(sink.write(&[b'o', b'k', 0xff]).unwrap(), 3);
        assert_eq!(recorder.output(StreamTag::Stdout), "ok\u{fffd}");
    }

    #[test]
    fn test_observer_failure_surfaces() {
        struct Closed;

        impl Observer for Closed {
            fn set_busy(&self, _busy: bool) {}

            fn append(&self, _tag: StreamTag, _text: &str) -> io::Result<()> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
        }

        let sink = OutputSink::new(Arc::new(Closed), StreamTag::Stderr);
        assert_eq!(
            sink.write_str("lost").unwrap_err().kind(),
            io::ErrorKind::BrokenPipe
        );
    }

    #[test]
    fn test_recording_busy_state() {
        let recorder = RecordingObserver::new();
        assert!(!recorder.is_busy());
        recorder.set_busy(true);
        recorder.append(StreamTag::Stdout, "x").unwrap();
        assert!(recorder.is_busy());
        recorder.set_busy(false);
        assert!(!recorder.is_busy());
    }

    #[test]
    fn test_writer_observer() {
        let observer = WriterObserver::new(Vec::new());
        observer.append(StreamTag::Stdout, "a").unwrap();
        observer.append(StreamTag::Stderr, "b").unwrap();
        assert_eq!(observer.into_inner(), b"ab");
    }
}
