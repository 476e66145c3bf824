//! Programmer trait definitions

use crate::error::Result;
use crate::spi::SpiCommand;
use bitflags::bitflags;

bitflags! {
    /// SPI master feature flags
    ///
    /// These flags indicate what capabilities a programmer supports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SpiFeatures: u32 {
        /// Supports commands with a 4-byte address phase
        const FOUR_BYTE_ADDR = 1 << 0;
        /// Can clock dummy cycles (needed for Fast Read)
        const DUMMY_CYCLES   = 1 << 1;
    }
}

impl Default for SpiFeatures {
    fn default() -> Self {
        SpiFeatures::empty()
    }
}

/// SPI master trait
///
/// A programmer that can execute raw SPI commands. Implementations carry no
/// chip knowledge: they clock out the opcode, address, dummy and write
/// bytes of a [`SpiCommand`] with chip select asserted, then fill its read
/// buffer.
///
/// ## Errors
///
/// A failed USB transfer is reported as `Error::Transport`. Implementations
/// should leave the bus idle (chip select deasserted) before returning so
/// the caller can simply re-issue the command. A programmer that has gone
/// away reports `TransportError::Disconnected`, which is never retried.
///
/// ## Transfer limit
///
/// `max_read_len()` is the bridge buffer limit for the read phase of one
/// command. Callers go through [`send_command`](super::send_command) or
/// check the limit themselves; implementations may reject larger reads.
pub trait SpiMaster {
    /// Get the features supported by this programmer
    fn features(&self) -> SpiFeatures;

    /// Get the maximum number of bytes that can be read in a single transaction
    fn max_read_len(&self) -> usize;

    /// Get the maximum number of bytes that can be written in a single transaction
    fn max_write_len(&self) -> usize;

    /// Execute a single SPI command
    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()>;

    /// Check if an opcode is supported by this programmer
    fn probe_opcode(&self, _opcode: u8) -> bool {
        true
    }

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);
}

// Boxed masters let the CLI pick a programmer at runtime
impl SpiMaster for Box<dyn SpiMaster + Send> {
    fn features(&self) -> SpiFeatures {
        (**self).features()
    }

    fn max_read_len(&self) -> usize {
        (**self).max_read_len()
    }

    fn max_write_len(&self) -> usize {
        (**self).max_write_len()
    }

    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        (**self).execute(cmd)
    }

    fn probe_opcode(&self, opcode: u8) -> bool {
        (**self).probe_opcode(opcode)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}
