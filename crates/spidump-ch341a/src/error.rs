//! Error types for CH341A programmer

use spidump_core::error::TransportError;

/// Result type for CH341A operations
pub type Result<T> = std::result::Result<T, Ch341aError>;

/// Errors that can occur when opening or configuring the CH341A
///
/// Failures on the SPI path are reported to the core as
/// [`TransportError`] so the reader can retry them.
#[derive(Debug, thiserror::Error)]
pub enum Ch341aError {
    /// Device not found
    #[error("CH341A device not found (VID:1a86 PID:5512)")]
    DeviceNotFound,
    /// Failed to enumerate or open the device
    #[error("failed to open CH341A: {0}")]
    OpenFailed(String),
    /// Failed to claim the interface or its endpoints
    #[error("failed to claim interface: {0}")]
    ClaimFailed(String),
    /// A USB transfer failed while configuring the device
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Map a failed nusb transfer onto the core's transport taxonomy
pub(crate) fn transfer_error(e: nusb::transfer::TransferError) -> TransportError {
    use nusb::transfer::TransferError;

    match e {
        TransferError::Stall => TransportError::Stall,
        TransferError::Disconnected => TransportError::Disconnected,
        other => TransportError::Transfer(other.to_string()),
    }
}
