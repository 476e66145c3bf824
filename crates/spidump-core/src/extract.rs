//! Identify, read, checksum and verify in one call

use std::time::{Duration, Instant};

use crate::chip::{self, ChipDatabase, ChipProfile};
use crate::error::{Error, IntegrityError, Result};
use crate::flash::{self, CancelToken, ReadOptions, ReadProgress, ReadStats};
use crate::programmer::SpiMaster;
use crate::verify::{self, Checksum, Sampling};

/// Options for a complete extraction
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Chunking and retry settings, used for identification too
    pub read: ReadOptions,
    /// Chunks to read back after the image is complete
    pub sampling: Sampling,
}

/// Outcome of the read-back step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// No read-back was requested
    NotPerformed,
    /// Every sampled chunk matched
    Verified {
        /// Number of chunks read back
        chunks: usize,
    },
    /// Read-back found differences; the image may not be trustworthy
    Unverified(IntegrityError),
}

impl Verification {
    /// True unless read-back found a difference
    pub fn is_ok(&self) -> bool {
        !matches!(self, Verification::Unverified(_))
    }
}

/// A finished extraction
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// The chip contents, exactly `profile.total_size` bytes
    pub image: Vec<u8>,
    /// Checksums of `image`
    pub checksum: Checksum,
    /// The chip that was read
    pub profile: ChipProfile,
    /// Wall time from the first command to the checksum
    pub duration: Duration,
    /// Read-back result
    pub verification: Verification,
    /// Chunk and retry counts of the read
    pub stats: ReadStats,
}

/// Identify the connected chip and extract it
pub fn extract_image<M, P>(
    master: &mut M,
    db: &ChipDatabase,
    opts: &ExtractOptions,
    progress: &mut P,
    cancel: &CancelToken,
) -> Result<ExtractionResult>
where
    M: SpiMaster + ?Sized,
    P: ReadProgress + ?Sized,
{
    let start = Instant::now();
    let profile = chip::identify(master, db, &opts.read.retry)?;
    extract_profile(master, profile, opts, progress, cancel, start)
}

/// Extract a chip whose profile is already known
///
/// Skips identification, for chips that do not answer RDID reliably.
/// `start` is when the caller began talking to the chip.
pub fn extract_profile<M, P>(
    master: &mut M,
    profile: ChipProfile,
    opts: &ExtractOptions,
    progress: &mut P,
    cancel: &CancelToken,
    start: Instant,
) -> Result<ExtractionResult>
where
    M: SpiMaster + ?Sized,
    P: ReadProgress + ?Sized,
{
    let (image, stats) = flash::extract(master, &profile, &opts.read, progress, cancel)?;
    let checksum = verify::checksum(&image);
    log::info!("Read {} bytes, {}", image.len(), checksum);

    let verification = if opts.sampling.is_none() {
        Verification::NotPerformed
    } else {
        match verify::verify_sample(master, &profile, &image, opts.sampling, &opts.read, progress) {
            Ok(chunks) => Verification::Verified { chunks },
            Err(Error::Integrity(e)) => {
                log::warn!("{}", e);
                Verification::Unverified(e)
            }
            Err(e) => return Err(e),
        }
    };

    Ok(ExtractionResult {
        image,
        checksum,
        profile,
        duration: start.elapsed(),
        verification,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::NoProgress;
    use crate::test_support::MockFlash;

    #[test]
    fn test_extract_image_pipeline() {
        let db = ChipDatabase::builtin();
        let mut mock = MockFlash::new([0xC8, 0x40, 0x14], 1024 * 1024);
        let opts = ExtractOptions {
            sampling: Sampling::Count(4),
            ..ExtractOptions::default()
        };

        let result =
            extract_image(&mut mock, &db, &opts, &mut NoProgress, &CancelToken::new()).unwrap();
        assert_eq!(result.profile.name, "GD25Q80");
        assert_eq!(result.image, mock.data);
        assert_eq!(result.checksum, verify::checksum(&mock.data));
        assert_eq!(result.verification, Verification::Verified { chunks: 4 });
    }

    #[test]
    fn test_extract_image_marks_unverified() {
        let db = ChipDatabase::builtin();
        let mut mock = MockFlash::new([0xC8, 0x40, 0x14], 1024 * 1024);
        // Corrupt chunk 0 once the last of the 1024 chunks has been read
        mock.flip_after_reads = Some((1024, 0x20));
        let opts = ExtractOptions {
            sampling: Sampling::Count(2),
            ..ExtractOptions::default()
        };

        let result =
            extract_image(&mut mock, &db, &opts, &mut NoProgress, &CancelToken::new()).unwrap();
        assert_eq!(result.image.len(), 1024 * 1024);
        match &result.verification {
            Verification::Unverified(e) => {
                assert_eq!(e.mismatches.len(), 1);
                assert_eq!(e.mismatches[0].first_diff, 0x20);
            }
            other => panic!("unexpected verification: {:?}", other),
        }
        assert!(!result.verification.is_ok());
    }

    #[test]
    fn test_extract_image_unknown_chip_reads_nothing() {
        let db = ChipDatabase::builtin();
        let mut mock = MockFlash::new([0x00, 0x00, 0x00], 4096);
        let err = extract_image(
            &mut mock,
            &db,
            &ExtractOptions::default(),
            &mut NoProgress,
            &CancelToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownChip(_)));
        assert!(mock.read_addresses().is_empty());
    }
}
