//! Paginated whole-chip reader

use super::{CancelToken, ReadProgress, ReadSession};
use crate::chip::ChipProfile;
use crate::error::{Error, Result};
use crate::programmer::SpiMaster;
use crate::protocol;
use crate::retry::{self, RetryContext, RetryPolicy};

/// Options for a whole-chip read
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Retry policy applied to every chunk
    pub retry: RetryPolicy,
    /// Bytes per read command; `None` picks the largest allowed size
    pub chunk_len: Option<u32>,
}

/// Statistics about a finished read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// Bytes per read command
    pub chunk_len: u32,
    /// Number of chunks read
    pub chunks: usize,
    /// Retries needed across all chunks
    pub retries: u32,
}

/// Work out the chunk length for `profile` on a bridge with `max_read_len`
///
/// A requested length must be a non-zero multiple of the page size and fit
/// in one transfer. Without one, the largest page multiple that fits is
/// used. Either way the result is clamped to the chip size.
pub fn resolve_chunk_len(
    profile: &ChipProfile,
    max_read_len: usize,
    requested: Option<u32>,
) -> Result<u32> {
    let page = profile.page_size;
    let max = u32::try_from(max_read_len).unwrap_or(u32::MAX);
    let invalid = |len| Error::InvalidChunkLength {
        len,
        page_size: page,
        max: max_read_len,
    };
    if page == 0 {
        return Err(invalid(requested.unwrap_or(0)));
    }

    let len = match requested {
        Some(len) if len == 0 || len % page != 0 || len > max => return Err(invalid(len)),
        Some(len) => len,
        None => {
            let len = max - max % page;
            if len == 0 {
                return Err(invalid(page));
            }
            len
        }
    };

    Ok(len.min(profile.total_size))
}

/// Read the whole chip
///
/// Chunks are read in ascending address order; chunk `i` lands at offset
/// `i * chunk_len` of the returned image, which is always exactly
/// `profile.total_size` bytes. A chunk whose transfer fails is retried
/// under `opts.retry`; when that runs out the read is aborted with
/// `Error::FatalTransport` and everything read so far is discarded.
///
/// `cancel` is checked before each chunk. A cancelled read returns
/// `Error::Cancelled` and likewise discards its data.
pub fn extract<M, P>(
    master: &mut M,
    profile: &ChipProfile,
    opts: &ReadOptions,
    progress: &mut P,
    cancel: &CancelToken,
) -> Result<(Vec<u8>, ReadStats)>
where
    M: SpiMaster + ?Sized,
    P: ReadProgress + ?Sized,
{
    let chunk_len = resolve_chunk_len(profile, master.max_read_len(), opts.chunk_len)?;
    let chip = profile.display_name();
    log::debug!(
        "Reading {} bytes from {} in {}-byte chunks",
        profile.total_size,
        chip,
        chunk_len
    );

    let mut session = ReadSession::new(profile);
    let mut stats = ReadStats {
        chunk_len,
        ..ReadStats::default()
    };
    progress.reading(profile.total_size as usize);

    while !session.is_complete() {
        let offset = session.bytes_read();
        if cancel.is_cancelled() {
            log::info!("Read cancelled at 0x{:08X}", offset);
            return Err(Error::Cancelled { offset });
        }

        let context = RetryContext {
            offset: Some(offset),
            chip: Some(chip.clone()),
        };
        let retries = session.fill_next(chunk_len, |addr, buf| {
            retry::run(master, &opts.retry, &context, |m| {
                protocol::read_chunk(m, profile, addr, &mut *buf)
            })
            .map(|r| r.retries)
            .map_err(|e| e.in_chunk(addr, &chip))
        })?;

        log::trace!("Read chunk at 0x{:08X}", offset);
        stats.chunks += 1;
        stats.retries += retries;
        progress.read_progress(session.bytes_read() as usize);
    }

    if stats.retries > 0 {
        log::info!("Read complete after {} retried transfer(s)", stats.retries);
    }
    progress.complete(&stats);
    Ok((session.into_image(), stats))
}
