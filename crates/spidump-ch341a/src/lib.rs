//! spidump-ch341a - CH341A USB programmer support
//!
//! This crate provides support for the CH341A USB-to-SPI programmer.
//! The CH341A is a cheap and widely available USB bridge commonly used
//! with a test clip to read SPI flash chips in circuit.
//!
//! # Protocol Overview
//!
//! The CH341A communicates via USB bulk transfers. SPI data is sent using
//! the `SPI_STREAM` command, and chip select is controlled via `UIO_STREAM`
//! commands. Data bytes must be bit-reversed due to the CH341A's bit ordering.
//!
//! # Example
//!
//! ```no_run
//! use spidump_ch341a::Ch341a;
//! use spidump_core::chip::{identify, ChipDatabase};
//! use spidump_core::retry::RetryPolicy;
//!
//! let mut ch341a = Ch341a::open()?;
//! let chip = identify(&mut ch341a, &ChipDatabase::builtin(), &RetryPolicy::default())?;
//! println!("Found {}", chip.display_name());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod device;
mod error;
pub mod protocol;

pub use device::{Ch341a, Ch341aDeviceInfo};
pub use error::{Ch341aError, Result};
