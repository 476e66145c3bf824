//! In-memory SPI flash used by the unit tests

use std::collections::VecDeque;

use crate::chip::ChipProfile;
use crate::error::{Result, TransportError};
use crate::programmer::{SpiFeatures, SpiMaster};
use crate::spi::{opcodes, SpiCommand};

/// Deterministic, non-repeating fill so misplaced chunks are detectable
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| (i ^ (i >> 8) ^ (i >> 16) ^ 0x5A) as u8)
        .collect()
}

pub struct MockFlash {
    pub jedec_id: [u8; 3],
    pub data: Vec<u8>,
    pub max_read: usize,
    pub features: SpiFeatures,
    /// (opcode, address, read length) of every executed command
    pub commands: Vec<(u8, Option<u32>, usize)>,
    pub delays: Vec<u32>,
    /// Errors returned by the next array reads, in order
    pub read_faults: VecDeque<TransportError>,
    /// Invert the byte at `.1` once `.0` array reads have completed
    pub flip_after_reads: Option<(usize, u32)>,
    reads: usize,
}

impl MockFlash {
    pub fn new(jedec_id: [u8; 3], size: usize) -> Self {
        Self {
            jedec_id,
            data: pattern(size),
            max_read: 1024,
            features: SpiFeatures::FOUR_BYTE_ADDR | SpiFeatures::DUMMY_CYCLES,
            commands: Vec::new(),
            delays: Vec::new(),
            read_faults: VecDeque::new(),
            flip_after_reads: None,
            reads: 0,
        }
    }

    pub fn for_profile(profile: &ChipProfile) -> Self {
        Self::new(profile.jedec_id.0, profile.total_size as usize)
    }

    /// Addresses of the array reads, in issue order
    pub fn read_addresses(&self) -> Vec<u32> {
        self.commands
            .iter()
            .filter(|(op, _, _)| is_array_read(*op))
            .filter_map(|(_, addr, _)| *addr)
            .collect()
    }
}

fn is_array_read(opcode: u8) -> bool {
    matches!(
        opcode,
        opcodes::READ | opcodes::FAST_READ | opcodes::READ_4B | opcodes::FAST_READ_4B
    )
}

impl SpiMaster for MockFlash {
    fn features(&self) -> SpiFeatures {
        self.features
    }

    fn max_read_len(&self) -> usize {
        self.max_read
    }

    fn max_write_len(&self) -> usize {
        64
    }

    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        self.commands
            .push((cmd.opcode, cmd.address, cmd.read_buf.len()));

        match cmd.opcode {
            opcodes::RDID => {
                for (i, b) in cmd.read_buf.iter_mut().enumerate() {
                    *b = self.jedec_id.get(i).copied().unwrap_or(0xFF);
                }
            }
            op if is_array_read(op) => {
                if let Some(fault) = self.read_faults.pop_front() {
                    return Err(fault.into());
                }
                let start = cmd.address.unwrap_or(0) as usize;
                for (i, b) in cmd.read_buf.iter_mut().enumerate() {
                    *b = self.data.get(start + i).copied().unwrap_or(0xFF);
                }
                self.reads += 1;
                if let Some((after, addr)) = self.flip_after_reads {
                    if self.reads == after {
                        self.data[addr as usize] ^= 0xFF;
                    }
                }
            }
            _ => cmd.read_buf.fill(0xFF),
        }
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        self.delays.push(us);
    }
}
