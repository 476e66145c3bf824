//! Protocol implementations
//!
//! This module contains the JEDEC SPI25 command sequences used to wake,
//! identify and read a chip.

mod spi25;

pub use spi25::*;
