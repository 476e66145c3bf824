//! Terminal progress bars for extraction

use indicatif::{ProgressBar, ProgressStyle};
use spidump_core::flash::{ReadProgress, ReadStats};

const BYTES_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}";
const CHUNKS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks {msg}";

/// `ReadProgress` drawing an indicatif bar, one per phase
#[derive(Default)]
pub struct BarProgress {
    bar: Option<ProgressBar>,
}

impl BarProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn start(&mut self, len: u64, template: &str, msg: &'static str) {
        self.finish();
        let bar = ProgressBar::new(len);
        match ProgressStyle::default_bar().template(template) {
            Ok(style) => bar.set_style(style.progress_chars("#>-")),
            Err(e) => log::debug!("Progress template rejected: {}", e),
        }
        bar.set_message(msg);
        self.bar = Some(bar);
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
    }

    /// Leave the current bar where it stopped, e.g. after an error
    pub fn abandon(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.abandon_with_message("failed");
        }
    }
}

impl ReadProgress for BarProgress {
    fn reading(&mut self, total_bytes: usize) {
        self.start(total_bytes as u64, BYTES_TEMPLATE, "Reading");
    }

    fn read_progress(&mut self, bytes_read: usize) {
        if let Some(bar) = &self.bar {
            bar.set_position(bytes_read as u64);
        }
    }

    fn verifying(&mut self, chunks: usize) {
        self.start(chunks as u64, CHUNKS_TEMPLATE, "Verifying");
    }

    fn verify_progress(&mut self, chunks_checked: usize) {
        if let Some(bar) = &self.bar {
            bar.set_position(chunks_checked as u64);
        }
    }

    fn complete(&mut self, stats: &ReadStats) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!(
                "Read complete ({} chunks, {} retries)",
                stats.chunks, stats.retries
            ));
        }
        self.finish();
    }
}

impl Drop for BarProgress {
    fn drop(&mut self) {
        self.finish();
    }
}
