// src/system/fanout.rs

use crate::models::SharedWriter;
use std::fmt;
use std::io::{self, Write};

/// One destination of a [`FanOutWriter`].
struct Sink<'a> {
    name: &'static str,
    writer: Box<dyn Write + Send + 'a>,
    failed: bool,
}

/// Broadcasts every chunk to an ordered list of destinations.
///
/// Destinations are independent: one that fails is logged once, marked failed and
/// skipped from then on, while the others keep receiving every byte. Writing to the
/// fan-out itself never fails.
pub struct FanOutWriter<'a> {
    stream: &'static str,
    sinks: Vec<Sink<'a>>,
}

impl fmt::Debug for FanOutWriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanOutWriter")
            .field("stream", &self.stream)
            .field("sinks", &self.sinks.iter().map(|s| s.name).collect::<Vec<_>>())
            .field("failed", &self.failed_sinks())
            .finish()
    }
}

impl<'a> FanOutWriter<'a> {
    /// Creates an empty fan-out for the stream called `stream` (used in log messages).
    pub fn new(stream: &'static str) -> Self {
        Self {
            stream,
            sinks: Vec::new(),
        }
    }

    /// Appends a destination.
    pub fn push(&mut self, name: &'static str, writer: impl Write + Send + 'a) {
        self.sinks.push(Sink {
            name,
            writer: Box::new(writer),
            failed: false,
        });
    }

    /// Appends a destination shared with the caller.
    pub fn push_shared(&mut self, name: &'static str, writer: SharedWriter) {
        self.push(name, SharedSink(writer));
    }

    /// The name of the stream this fan-out carries.
    pub fn stream(&self) -> &'static str {
        self.stream
    }

    /// Number of destinations, failed ones included.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// `true` when no destination was added.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Names of the destinations that failed and were dropped.
    pub fn failed_sinks(&self) -> Vec<&'static str> {
        self.sinks
            .iter()
            .filter(|sink| sink.failed)
            .map(|sink| sink.name)
            .collect()
    }

    fn mark_failed(stream: &'static str, sink: &mut Sink<'a>, err: &io::Error) {
        log::warn!(
            "Dropping {} destination '{}' after a write failure: {}",
            stream,
            sink.name,
            err
        );
        sink.failed = true;
    }
}

impl Write for FanOutWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for sink in self.sinks.iter_mut().filter(|sink| !sink.failed) {
            if let Err(e) = sink.writer.write_all(buf) {
                Self::mark_failed(self.stream, sink, &e);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        for sink in self.sinks.iter_mut().filter(|sink| !sink.failed) {
            if let Err(e) = sink.writer.flush() {
                Self::mark_failed(self.stream, sink, &e);
            }
        }
        Ok(())
    }
}

/// Adapts a [`SharedWriter`] to `Write` by locking it for each call.
struct SharedSink(SharedWriter);

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("shared writer mutex is poisoned"))?
            .write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("shared writer mutex is poisoned"))?
            .write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("shared writer mutex is poisoned"))?
            .flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_every_destination_gets_identical_copy() {
        // --- Setup ---
        let mut first = Vec::new();
        let mut second = Vec::new();
        let shared = Arc::new(Mutex::new(Vec::<u8>::new()));

        // --- Execute ---
        {
            let mut fanout = FanOutWriter::new("stdout");
            fanout.push("first", &mut first);
            fanout.push("second", &mut second);
            fanout.push_shared("shared", shared.clone());
            fanout.write_all(b"hello ").unwrap();
            fanout.write_all(b"world").unwrap();
            fanout.flush().unwrap();
            assert_eq!(fanout.len(), 3);
        }

        // --- Assert ---
        assert_eq!(first, b"hello world");
        assert_eq!(second, b"hello world");
        assert_eq!(*shared.lock().unwrap(), b"hello world");
    }

    #[test]
    fn test_failing_destination_does_not_starve_the_others() {
        let mut healthy = Vec::new();
        let failed;
        {
            let mut fanout = FanOutWriter::new("stderr");
            fanout.push("broken", BrokenWriter);
            fanout.push("healthy", &mut healthy);

            assert_eq!(fanout.write(b"abc").unwrap(), 3);
            assert_eq!(fanout.write(b"def").unwrap(), 3);
            failed = fanout.failed_sinks();
        }

        assert_eq!(healthy, b"abcdef");
        assert_eq!(failed, vec!["broken"]);
    }

    #[test]
    fn test_poisoned_shared_writer_is_isolated() {
        let poisoned: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let clone = poisoned.clone();
        let _ = std::thread::spawn(move || {
            let _guard = clone.lock().unwrap();
            panic!("poison the mutex");
        })
        .join();

        let mut healthy = Vec::new();
        {
            let mut fanout = FanOutWriter::new("stdout");
            fanout.push_shared("poisoned", poisoned);
            fanout.push("healthy", &mut healthy);
            fanout.write_all(b"still delivered").unwrap();
            assert_eq!(fanout.failed_sinks(), vec!["poisoned"]);
        }
        assert_eq!(healthy, b"still delivered");
    }

    #[test]
    fn test_empty_fanout_swallows_output() {
        let mut fanout = FanOutWriter::new("stdout");
        assert!(fanout.is_empty());
        assert_eq!(fanout.write(b"nobody listens").unwrap(), 14);
    }
}
