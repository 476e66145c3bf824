//! SPI25 protocol implementation
//!
//! This module implements the JEDEC command sequences needed to extract a
//! chip: wake-up, ID read and bounded array reads. None of
//! these retry on their own; callers wrap them in [`retry::run`].
//!
//! [`retry::run`]: crate::retry::run

use crate::chip::{ChipProfile, JedecId};
use crate::error::{Error, Result};
use crate::programmer::{send_command, SpiFeatures, SpiMaster};
use crate::spi::{opcodes, AddressWidth, SpiCommand};

/// Time a chip needs to leave deep power down (tRES1), with margin
pub const RELEASE_POWER_DOWN_DELAY_US: u32 = 50;

/// Read the JEDEC ID from a flash chip
pub fn read_jedec_id<M: SpiMaster + ?Sized>(master: &mut M) -> Result<JedecId> {
    let resp = send_command(master, opcodes::RDID, None, &[], 3)?;
    Ok(JedecId::new([resp[0], resp[1], resp[2]]))
}

/// Release the chip from deep power down
///
/// Harmless on a chip that is already awake. Waits tRES1 before returning
/// so the next command is answered.
pub fn release_power_down<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    send_command(master, opcodes::RES, None, &[], 0)?;
    master.delay_us(RELEASE_POWER_DOWN_DELAY_US);
    Ok(())
}

/// Read one chunk of the array with the profile's read command
///
/// `buf.len()` bytes are read starting at `addr` in a single command, so
/// the chunk must fit in one bridge transfer. Address width and dummy
/// cycles follow the profile's read opcode.
pub fn read_chunk<M: SpiMaster + ?Sized>(
    master: &mut M,
    profile: &ChipProfile,
    addr: u32,
    buf: &mut [u8],
) -> Result<()> {
    let end = addr as u64 + buf.len() as u64;
    if end > profile.total_size as u64 {
        return Err(Error::AddressOutOfBounds {
            addr,
            len: buf.len(),
            size: profile.total_size,
        });
    }

    let max = master.max_read_len();
    if buf.len() > max {
        return Err(Error::TransferTooLarge {
            len: buf.len(),
            max,
        });
    }

    let opcode = profile.read_command;
    if !master.probe_opcode(opcode) {
        return Err(Error::OpcodeNotSupported(opcode));
    }

    let width = profile.address_width();
    let dummy_cycles = profile.read_dummy_cycles();
    let features = master.features();
    if (width == AddressWidth::FourByte && !features.contains(SpiFeatures::FOUR_BYTE_ADDR))
        || (dummy_cycles > 0 && !features.contains(SpiFeatures::DUMMY_CYCLES))
    {
        return Err(Error::OpcodeNotSupported(opcode));
    }

    let mut cmd = SpiCommand::read(opcode, width, addr, buf).with_dummy_cycles(dummy_cycles);
    master.execute(&mut cmd)
}
