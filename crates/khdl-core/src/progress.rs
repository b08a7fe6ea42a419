//! Progress reporting for file downloads.
//!
//! The core reports the discovered album and byte counts; rendering is up to
//! the sink. The CLI renders a terminal bar, tests use [`NoProgress`].

use crate::album::AlbumListing;
use std::path::Path;

/// Receives progress for one file download at a time.
pub trait ProgressSink {
    /// The album was discovered and its output directory is ready.
    fn album(&mut self, _listing: &AlbumListing, _directory: &Path) {}
    /// A new file download begins. `total` is the probed content length.
    fn start(&mut self, label: &str, total: u64);
    /// Bytes received so far for the current file.
    fn update(&mut self, current: u64);
    /// The current file finished successfully.
    fn finish(&mut self);
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&mut self, _label: &str, _total: u64) {}
    fn update(&mut self, _current: u64) {}
    fn finish(&mut self) {}
}
