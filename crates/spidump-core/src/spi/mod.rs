//! SPI types and command structures
//!
//! This module provides the transaction type handed to a programmer and
//! the JEDEC opcodes used while identifying and reading a chip.

mod address;
mod command;
pub mod opcodes;

pub use address::AddressWidth;
pub use command::SpiCommand;
pub use opcodes::*;
