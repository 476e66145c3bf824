//! Error types for spidump-core
//!
//! The taxonomy mirrors how failures are handled:
//!
//! - [`TransportError`] - a single SPI transfer failed; usually transient
//!   and retried locally by the caller that issued it
//! - [`FatalTransportError`] - retries were exhausted or the failure cannot
//!   be retried; the current session is aborted
//! - [`UnknownChipError`] - the JEDEC ID matched no known profile
//! - [`IntegrityError`] - sampled read-back differed from the image

use core::fmt;

use crate::chip::JedecId;

/// A failed SPI transfer on the bridge
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The transfer did not complete in time
    #[error("USB transfer timed out")]
    Timeout,
    /// Fewer bytes arrived than were requested
    #[error("short transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer {
        /// Bytes requested
        expected: usize,
        /// Bytes received
        actual: usize,
    },
    /// The endpoint reported a stall
    #[error("USB endpoint stalled")]
    Stall,
    /// The programmer went away
    #[error("programmer disconnected")]
    Disconnected,
    /// Any other USB level failure
    #[error("USB transfer failed: {0}")]
    Transfer(String),
}

impl TransportError {
    /// Returns true if repeating the same transfer may succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Disconnected)
    }
}

/// A transport failure that ended the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalTransportError {
    /// Flash address of the chunk being transferred, if any
    pub offset: Option<u32>,
    /// Chip the session was talking to, if identified
    pub chip: Option<String>,
    /// Number of attempts made before giving up
    pub attempts: u32,
    /// The last transfer error seen
    pub cause: TransportError,
}

impl fmt::Display for FatalTransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} after {} attempt(s)", self.cause, self.attempts)?;
        if let Some(offset) = self.offset {
            write!(f, " at 0x{:08X}", offset)?;
        }
        if let Some(chip) = &self.chip {
            write!(f, " ({})", chip)?;
        }
        Ok(())
    }
}

impl std::error::Error for FatalTransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// The chip answered with a JEDEC ID that is not in the database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownChipError {
    /// The ID the chip returned
    pub jedec_id: JedecId,
}

impl UnknownChipError {
    /// Returns true if the ID looks like nothing is connected at all
    pub fn is_absent(&self) -> bool {
        self.jedec_id.is_blank()
    }
}

impl fmt::Display for UnknownChipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_absent() {
            write!(
                f,
                "no flash chip detected (JEDEC ID {}), check the clip and wiring",
                self.jedec_id
            )
        } else {
            write!(f, "unknown flash chip with JEDEC ID {}", self.jedec_id)
        }
    }
}

impl std::error::Error for UnknownChipError {}

/// One sampled chunk whose read-back differed from the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkMismatch {
    /// Flash address of the chunk
    pub offset: u32,
    /// Chunk length in bytes
    pub len: u32,
    /// Address of the first differing byte
    pub first_diff: u32,
    /// Byte held in the image at `first_diff`
    pub expected: u8,
    /// Byte read back from the chip at `first_diff`
    pub actual: u8,
}

/// Sampled read-back did not match the extracted image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityError {
    /// Number of chunks that were re-read
    pub chunks_checked: usize,
    /// Every mismatching chunk, in address order
    pub mismatches: Vec<ChunkMismatch>,
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "integrity check failed: {} of {} sampled chunk(s) differ",
            self.mismatches.len(),
            self.chunks_checked
        )?;
        if let Some(first) = self.mismatches.first() {
            write!(
                f,
                ", first at 0x{:08X}: image has 0x{:02X}, chip returned 0x{:02X}",
                first.first_diff, first.expected, first.actual
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for IntegrityError {}

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A single transfer failed and may be retried
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// The session was aborted by the transport
    #[error("fatal transport error: {0}")]
    FatalTransport(#[from] FatalTransportError),
    /// JEDEC ID not found in the chip database
    #[error(transparent)]
    UnknownChip(#[from] UnknownChipError),
    /// Read-back verification found differences
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
    /// The read was cancelled at a chunk boundary
    #[error("read cancelled at 0x{offset:08X}")]
    Cancelled {
        /// Address of the next chunk that would have been read
        offset: u32,
    },
    /// Address range lies outside the chip
    #[error("range 0x{addr:08X}+{len} is outside the {size}-byte chip")]
    AddressOutOfBounds {
        /// Start address
        addr: u32,
        /// Length in bytes
        len: usize,
        /// Chip size in bytes
        size: u32,
    },
    /// Chunk length is not a usable multiple of the page size
    #[error("chunk length {len} must be a non-zero multiple of the {page_size}-byte page and at most {max} bytes")]
    InvalidChunkLength {
        /// Requested chunk length
        len: u32,
        /// Page size of the chip
        page_size: u32,
        /// Transfer limit of the programmer
        max: usize,
    },
    /// A single transfer exceeded the bridge buffer limit
    #[error("transfer of {len} bytes exceeds the programmer limit of {max} bytes")]
    TransferTooLarge {
        /// Requested length
        len: usize,
        /// Programmer limit
        max: usize,
    },
    /// Opcode rejected by the programmer
    #[error("SPI opcode 0x{0:02X} not supported by programmer")]
    OpcodeNotSupported(u8),
    /// A chunk read failed for a reason other than the transport
    #[error("reading chunk at 0x{offset:08X} of {chip}: {source}")]
    Chunk {
        /// Flash address of the chunk
        offset: u32,
        /// Chip being read
        chip: String,
        /// What went wrong
        source: Box<Error>,
    },
}

impl Error {
    /// Returns true if the operation that produced this error may be retried
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_retryable())
    }

    /// Attach the chunk address and chip name to an error from a chunk read
    ///
    /// Fatal transport errors already carry both and are returned as is.
    pub fn in_chunk(self, offset: u32, chip: &str) -> Self {
        match self {
            Self::FatalTransport(_) | Self::Chunk { .. } => self,
            source => Self::Chunk {
                offset,
                chip: chip.to_string(),
                source: Box::new(source),
            },
        }
    }
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
