//! Sampled read-back verification

use core::fmt;
use core::str::FromStr;

use super::{checksum, Checksum};
use crate::chip::ChipProfile;
use crate::error::{ChunkMismatch, Error, IntegrityError, Result};
use crate::flash::{resolve_chunk_len, ReadOptions, ReadProgress};
use crate::programmer::SpiMaster;
use crate::protocol;
use crate::retry::{self, RetryContext};

/// Which chunks to read back after an extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sampling {
    /// No read-back
    #[default]
    None,
    /// Every chunk
    All,
    /// `n` chunks spread evenly over the chip, first and last included
    Count(usize),
    /// Every `n`-th chunk, starting with the first
    Every(usize),
}

impl Sampling {
    /// True if no chunk would be read back
    pub fn is_none(&self) -> bool {
        matches!(
            self,
            Sampling::None | Sampling::Count(0) | Sampling::Every(0)
        )
    }
}

impl fmt::Display for Sampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sampling::None => write!(f, "none"),
            Sampling::All => write!(f, "all"),
            Sampling::Count(n) => write!(f, "{}", n),
            Sampling::Every(n) => write!(f, "every:{}", n),
        }
    }
}

impl FromStr for Sampling {
    type Err = String;

    /// Parse `none`, `all`, a chunk count, or `every:N`
    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let parse_n = |v: &str| {
            v.parse::<usize>()
                .map_err(|_| format!("invalid sample size '{}'", v))
        };
        match s.to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Sampling::None),
            "all" => Ok(Sampling::All),
            other => match other.strip_prefix("every:") {
                Some(n) => parse_n(n).map(Sampling::Every),
                None => parse_n(other).map(Sampling::Count),
            },
        }
    }
}

/// Pick the chunk indices to read back out of `chunk_count` chunks
///
/// Deterministic: the same inputs always give the same ascending,
/// duplicate-free indices, all below `chunk_count`.
pub fn select_chunks(chunk_count: usize, sampling: Sampling) -> Vec<usize> {
    match sampling {
        Sampling::None | Sampling::Count(0) | Sampling::Every(0) => Vec::new(),
        _ if chunk_count == 0 => Vec::new(),
        Sampling::All => (0..chunk_count).collect(),
        Sampling::Count(n) if n >= chunk_count => (0..chunk_count).collect(),
        Sampling::Count(1) => vec![0],
        Sampling::Count(n) => {
            // Steps are at least one chunk apart since n < chunk_count
            let last = (chunk_count - 1) as u64;
            let steps = (n - 1) as u64;
            (0..n as u64).map(|i| (i * last / steps) as usize).collect()
        }
        Sampling::Every(n) => (0..chunk_count).step_by(n).collect(),
    }
}

/// Read back the sampled chunks of `image` and compare them
///
/// `image` must be the full chip image just extracted with the same chunk
/// length. Returns the number of chunks checked, or `Error::Integrity`
/// listing every chunk that differs. Transfers are retried under
/// `opts.retry` like the extraction itself.
pub fn verify_sample<M, P>(
    master: &mut M,
    profile: &ChipProfile,
    image: &[u8],
    sampling: Sampling,
    opts: &ReadOptions,
    progress: &mut P,
) -> Result<usize>
where
    M: SpiMaster + ?Sized,
    P: ReadProgress + ?Sized,
{
    if image.len() != profile.total_size as usize {
        return Err(Error::AddressOutOfBounds {
            addr: 0,
            len: image.len(),
            size: profile.total_size,
        });
    }

    let chunk_len = resolve_chunk_len(profile, master.max_read_len(), opts.chunk_len)?;
    let chunk_count = profile.total_size.div_ceil(chunk_len) as usize;
    let chunks = select_chunks(chunk_count, sampling);
    if chunks.is_empty() {
        return Ok(0);
    }

    log::info!(
        "Verifying {} of {} chunk(s) ({})",
        chunks.len(),
        chunk_count,
        sampling
    );
    progress.verifying(chunks.len());

    let chip = profile.display_name();
    let mut buf = vec![0u8; chunk_len as usize];
    let mut mismatches = Vec::new();

    for (checked, &index) in chunks.iter().enumerate() {
        let offset = index as u32 * chunk_len;
        let len = chunk_len.min(profile.total_size - offset);
        let readback = &mut buf[..len as usize];

        let context = RetryContext {
            offset: Some(offset),
            chip: Some(chip.clone()),
        };
        retry::run(master, &opts.retry, &context, |m| {
            protocol::read_chunk(m, profile, offset, &mut *readback)
        })
        .map_err(|e| e.in_chunk(offset, &chip))?;

        let expected = &image[offset as usize..(offset + len) as usize];
        if let Some(i) = expected.iter().zip(readback.iter()).position(|(e, a)| e != a) {
            let mismatch = ChunkMismatch {
                offset,
                len,
                first_diff: offset + i as u32,
                expected: expected[i],
                actual: readback[i],
            };
            log::warn!(
                "Chunk at 0x{:08X} differs at 0x{:08X}: image 0x{:02X}, chip 0x{:02X}",
                offset,
                mismatch.first_diff,
                mismatch.expected,
                mismatch.actual
            );
            mismatches.push(mismatch);
        }
        progress.verify_progress(checked + 1);
    }

    if mismatches.is_empty() {
        log::info!("Verified {} chunk(s)", chunks.len());
        Ok(chunks.len())
    } else {
        Err(IntegrityError {
            chunks_checked: chunks.len(),
            mismatches,
        }
        .into())
    }
}

/// Checksum `image` and optionally read back a sample of it
///
/// The checksum is always computed. An integrity failure is returned as
/// `Error::Integrity`; callers that want the checksum anyway call
/// [`checksum`] and [`verify_sample`] separately.
pub fn verify_image<M, P>(
    master: &mut M,
    profile: &ChipProfile,
    image: &[u8],
    sampling: Sampling,
    opts: &ReadOptions,
    progress: &mut P,
) -> Result<Checksum>
where
    M: SpiMaster + ?Sized,
    P: ReadProgress + ?Sized,
{
    let sum = checksum(image);
    verify_sample(master, profile, image, sampling, opts, progress)?;
    Ok(sum)
}
