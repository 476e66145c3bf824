//! spidump-dummy - In-memory flash emulator for testing
//!
//! This crate provides a dummy programmer with a flash chip behind it,
//! emulated in memory. Besides answering the identification and read
//! commands it can inject transport faults, fall asleep in deep power down
//! and change its contents after a number of reads, which is what the
//! retry and verification paths need to be exercised without hardware.

use spidump_core::chip::{ChipProfile, JedecId};
use spidump_core::error::{Error, Result, TransportError};
use spidump_core::programmer::{SpiFeatures, SpiMaster};
use spidump_core::spi::{opcodes, SpiCommand};

/// Configuration for the dummy flash
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// ID answered to RDID
    pub jedec_id: JedecId,
    /// Flash size in bytes
    pub size: usize,
    /// Bridge transfer limit reported through `max_read_len()`
    pub max_transfer: usize,
    /// Start in deep power down, ignoring RDID until woken with RES
    pub asleep: bool,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            jedec_id: JedecId::from_parts(0xEF, 0x4018), // W25Q128
            size: 16 * 1024 * 1024,
            max_transfer: 4096,
            asleep: false,
        }
    }
}

impl DummyConfig {
    /// Configuration matching a chip profile
    pub fn from_profile(profile: &ChipProfile) -> Self {
        Self {
            jedec_id: profile.jedec_id,
            size: profile.total_size as usize,
            ..Self::default()
        }
    }
}

/// Which array reads a fault applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultTrigger {
    /// The n-th read command (0-based, failed attempts included) and the
    /// ones after it while the fault has repeats left
    NthRead(usize),
    /// Any read whose range covers this address
    Address(u32),
}

#[derive(Debug, Clone)]
struct Fault {
    trigger: FaultTrigger,
    remaining: u32,
    error: TransportError,
}

/// Dummy flash programmer
///
/// Emulates a flash chip in memory for testing purposes.
pub struct DummyFlash {
    config: DummyConfig,
    data: Vec<u8>,
    asleep: bool,
    disconnected: bool,
    faults: Vec<Fault>,
    read_attempts: usize,
    reads_done: usize,
    corrupt_after: Option<(usize, u32)>,
    read_log: Vec<u32>,
}

impl DummyFlash {
    /// Create a new dummy flash, erased to 0xFF
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![0xFF; config.size];
        let asleep = config.asleep;
        Self {
            config,
            data,
            asleep,
            disconnected: false,
            faults: Vec::new(),
            read_attempts: 0,
            reads_done: 0,
            corrupt_after: None,
            read_log: Vec::new(),
        }
    }

    /// Create a dummy flash with pre-filled data
    ///
    /// Data beyond the chip size is ignored; a shorter image leaves the rest
    /// erased.
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config);
        let len = initial_data.len().min(flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the flash data
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Fail matching reads `times` times with `error`
    pub fn inject_fault(&mut self, trigger: FaultTrigger, times: u32, error: TransportError) {
        self.faults.push(Fault {
            trigger,
            remaining: times,
            error,
        });
    }

    /// Invert the byte at `addr` once `reads` read commands have succeeded
    ///
    /// Simulates a chip whose contents are unstable, so that read-back
    /// differs from what was extracted.
    pub fn corrupt_after_reads(&mut self, reads: usize, addr: u32) {
        self.corrupt_after = Some((reads, addr));
    }

    /// Make every following command fail as if the USB cable was pulled
    pub fn disconnect(&mut self) {
        self.disconnected = true;
    }

    /// True while the chip is in deep power down
    pub fn is_asleep(&self) -> bool {
        self.asleep
    }

    /// Start addresses of all successful reads, in order
    pub fn read_log(&self) -> &[u32] {
        &self.read_log
    }

    /// Number of read commands received, failed ones included
    pub fn read_attempts(&self) -> usize {
        self.read_attempts
    }

    fn take_fault(&mut self, addr: u32, len: usize) -> Option<TransportError> {
        let attempt = self.read_attempts;
        let end = addr as u64 + len as u64;
        let fault = self.faults.iter_mut().find(|f| {
            f.remaining > 0
                && match f.trigger {
                    FaultTrigger::NthRead(n) => attempt >= n,
                    FaultTrigger::Address(a) => (addr as u64..end).contains(&(a as u64)),
                }
        })?;
        fault.remaining -= 1;
        Some(fault.error.clone())
    }

    fn handle_read(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        let addr = cmd.address.unwrap_or(0);
        let len = cmd.read_buf.len();

        let fault = self.take_fault(addr, len);
        self.read_attempts += 1;
        if let Some(error) = fault {
            log::debug!("dummy: injecting {} at 0x{:08X}", error, addr);
            return Err(error.into());
        }

        let start = addr as usize;
        if start + len > self.data.len() {
            return Err(Error::AddressOutOfBounds {
                addr,
                len,
                size: self.data.len() as u32,
            });
        }
        cmd.read_buf.copy_from_slice(&self.data[start..start + len]);
        self.read_log.push(addr);
        self.reads_done += 1;

        if let Some((after, target)) = self.corrupt_after {
            if self.reads_done == after {
                if let Some(b) = self.data.get_mut(target as usize) {
                    *b ^= 0xFF;
                }
            }
        }
        Ok(())
    }
}

impl SpiMaster for DummyFlash {
    fn features(&self) -> SpiFeatures {
        SpiFeatures::FOUR_BYTE_ADDR | SpiFeatures::DUMMY_CYCLES
    }

    fn max_read_len(&self) -> usize {
        self.config.max_transfer
    }

    fn max_write_len(&self) -> usize {
        self.config.max_transfer
    }

    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        if self.disconnected {
            return Err(TransportError::Disconnected.into());
        }

        match cmd.opcode {
            opcodes::RES => {
                self.asleep = false;
                // RES doubles as Read Electronic Signature
                cmd.read_buf.fill(self.config.jedec_id.0[2]);
                Ok(())
            }
            opcodes::DP => {
                self.asleep = true;
                Ok(())
            }
            // A sleeping chip leaves the bus floating
            _ if self.asleep => {
                cmd.read_buf.fill(0xFF);
                Ok(())
            }
            opcodes::RDID => {
                for (dst, src) in cmd.read_buf.iter_mut().zip(self.config.jedec_id.0) {
                    *dst = src;
                }
                Ok(())
            }
            opcodes::RDSR => {
                cmd.read_buf.fill(0);
                Ok(())
            }
            opcodes::READ | opcodes::FAST_READ | opcodes::READ_4B | opcodes::FAST_READ_4B => {
                self.handle_read(cmd)
            }
            op => Err(Error::OpcodeNotSupported(op)),
        }
    }

    fn delay_us(&mut self, _us: u32) {
        // No delay needed for in-memory operations
    }
}
