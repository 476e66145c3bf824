//! spidump-core - Core library for SPI NOR flash extraction
//!
//! This crate contains everything between a raw SPI programmer and a
//! finished firmware image:
//!
//! - [`programmer`] - the `SpiMaster` transport seam and bounded transfers
//! - [`chip`] - chip profiles, the built-in JEDEC table and identification
//! - [`flash`] - the paginated whole-chip reader
//! - [`verify`] - checksums and sampled read-back verification
//! - [`extract`] - the pipeline tying the above together
//!
//! All operations are synchronous. A programmer is borrowed mutably for the
//! whole duration of an operation, so only one session can drive a bridge
//! at a time.
//!
//! # Example
//!
//! ```ignore
//! use spidump_core::chip::ChipDatabase;
//! use spidump_core::extract::{extract_image, ExtractOptions};
//! use spidump_core::flash::{CancelToken, NoProgress};
//!
//! let db = ChipDatabase::builtin();
//! let opts = ExtractOptions::default();
//! let result = extract_image(&mut master, &db, &opts, &mut NoProgress, &CancelToken::new())?;
//! println!("{} {}: {}", result.profile.vendor, result.profile.name, result.checksum);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod chip;
pub mod error;
pub mod extract;
pub mod flash;
pub mod programmer;
pub mod protocol;
pub mod retry;
pub mod spi;
pub mod verify;

pub use error::{Error, Result};

#[cfg(test)]
mod test_support;
