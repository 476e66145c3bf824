//! Progress reporting

use super::ReadStats;

/// Callback for progress reporting during extraction
pub trait ReadProgress {
    /// Called when starting to read the chip
    fn reading(&mut self, total_bytes: usize);

    /// Called after each chunk with the running byte count
    fn read_progress(&mut self, bytes_read: usize);

    /// Called when starting sampled read-back
    fn verifying(&mut self, chunks: usize);

    /// Called after each sampled chunk is compared
    fn verify_progress(&mut self, chunks_checked: usize);

    /// Called when the read is complete
    fn complete(&mut self, stats: &ReadStats);
}

/// A no-op progress reporter
pub struct NoProgress;

impl ReadProgress for NoProgress {
    fn reading(&mut self, _total_bytes: usize) {}
    fn read_progress(&mut self, _bytes_read: usize) {}
    fn verifying(&mut self, _chunks: usize) {}
    fn verify_progress(&mut self, _chunks_checked: usize) {}
    fn complete(&mut self, _stats: &ReadStats) {}
}
