//! Write destinations for response bodies.

use crate::error::{Error, Result};
use crate::progress::ProgressSink;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Destination for a streamed response body.
pub trait BodySink {
    /// Consume the next chunk of the body.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Bytes received so far. Sinks that don't report progress ignore it.
    fn progress(&mut self, _received: u64) {}
}

/// Accumulates a whole page in memory.
#[derive(Debug, Default)]
pub struct PageBuffer {
    body: Vec<u8>,
}

impl PageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The body as text; invalid UTF-8 is replaced rather than rejected.
    pub fn into_string(self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl BodySink for PageBuffer {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.body.extend_from_slice(data);
        Ok(())
    }
}

/// Appends the body to a file and forwards byte counts to a [`ProgressSink`].
pub struct FileSink<'p> {
    file: File,
    path: PathBuf,
    written: u64,
    reported: u64,
    progress: &'p mut dyn ProgressSink,
}

impl<'p> FileSink<'p> {
    /// Creates (truncating) `path` and announces the download to `progress`.
    pub fn create(path: &Path, total: u64, progress: &'p mut dyn ProgressSink) -> Result<Self> {
        let file = File::create(path).map_err(|e| Error::io("failed to open file", path, e))?;
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        progress.start(&label, total);
        Ok(Self {
            file,
            path: path.to_path_buf(),
            written: 0,
            reported: 0,
            progress,
        })
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flushes file data to disk and closes the handle. Returns bytes written.
    pub fn close(self) -> Result<u64> {
        self.file
            .sync_all()
            .map_err(|e| Error::io("failed to flush file", &self.path, e))?;
        Ok(self.written)
    }
}

impl BodySink for FileSink<'_> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.file
            .write_all(data)
            .map_err(|e| Error::io("failed to write file", &self.path, e))?;
        self.written += data.len() as u64;
        Ok(())
    }

    fn progress(&mut self, received: u64) {
        if received != self.reported {
            self.reported = received;
            self.progress.update(received);
        }
    }
}
