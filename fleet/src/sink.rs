//! Serialized user-facing output
//!
//! Every device task prints through one [`OutputSink`], which holds a lock
//! around the writer for the duration of a single call. Lines from
//! different tasks may come out in any order but are never spliced together.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// Thread-safe line writer shared by all device tasks
pub struct OutputSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

/// Shared in-memory target returned by [`OutputSink::buffer`]
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Everything written so far, decoded lossily
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl OutputSink {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Sink writing to the process's stdout
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Sink writing into memory, plus a handle to read it back
    pub fn buffer() -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Self::new(Box::new(buffer.clone())), buffer)
    }

    /// Write one line atomically
    pub fn print_line(&self, text: impl AsRef<str>) {
        self.write_locked(text.as_ref());
    }

    /// Write several lines with no other output in between
    pub fn print_block<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let block: Vec<String> = lines.into_iter().map(|l| l.as_ref().to_string()).collect();
        self.write_locked(&block.join("\n"));
    }

    fn write_locked(&self, text: &str) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        // A closed stdout (e.g. piped into `head`) is not worth failing a device task over.
        if let Err(e) = writeln!(writer, "{}", text).and_then(|()| writer.flush()) {
            tracing::debug!("Dropping output line: {}", e);
        }
    }
}

impl Default for OutputSink {
    fn default() -> Self {
        Self::stdout()
    }
}
