//! Terminal progress bar for file downloads.

use indicatif::{ProgressBar, ProgressStyle};
use khdl_core::progress::ProgressSink;
use khdl_core::AlbumListing;
use std::path::Path;

/// One bar per file; the bar of a failed download is abandoned in place.
#[derive(Default)]
pub struct TerminalProgress {
    bar: Option<ProgressBar>,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

fn style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("##-")
}

impl ProgressSink for TerminalProgress {
    fn album(&mut self, listing: &AlbumListing, _directory: &Path) {
        println!("{}", listing.title);
        println!("Downloading {}", listing.url);
    }

    fn start(&mut self, label: &str, total: u64) {
        if let Some(stale) = self.bar.take() {
            stale.abandon();
        }
        let bar = ProgressBar::new(total);
        bar.set_style(style());
        bar.set_message(label.to_string());
        self.bar = Some(bar);
    }

    fn update(&mut self, current: u64) {
        if let Some(bar) = &self.bar {
            bar.set_position(current);
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
    }
}

impl Drop for TerminalProgress {
    fn drop(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.abandon();
        }
    }
}
