//! Chip profile type definitions

use core::fmt;
use std::borrow::Cow;

use bitflags::bitflags;

use crate::spi::{opcodes, AddressWidth};

/// 3-byte JEDEC ID as returned by RDID (0x9F)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JedecId(pub [u8; 3]);

impl JedecId {
    /// Create an ID from the raw RDID response bytes
    pub const fn new(bytes: [u8; 3]) -> Self {
        Self(bytes)
    }

    /// Create an ID from manufacturer and 16-bit device ID
    pub const fn from_parts(manufacturer: u8, device: u16) -> Self {
        Self([manufacturer, (device >> 8) as u8, device as u8])
    }

    /// JEDEC manufacturer ID
    pub const fn manufacturer(&self) -> u8 {
        self.0[0]
    }

    /// Device ID (memory type and capacity bytes)
    pub const fn device(&self) -> u16 {
        ((self.0[1] as u16) << 8) | self.0[2] as u16
    }

    /// True if every byte is 0x00 or every byte is 0xFF
    ///
    /// That is what a floating or shorted bus reads back when no chip is
    /// answering.
    pub fn is_blank(&self) -> bool {
        self.0 == [0x00; 3] || self.0 == [0xFF; 3]
    }
}

impl fmt::Display for JedecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X} {:04X}", self.manufacturer(), self.device())
    }
}

bitflags! {
    /// Feature flags for flash chips
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Features: u32 {
        /// Supports Fast Read (0x0B)
        const FAST_READ        = 1 << 0;
        /// Has native 4-byte address commands (0x13, 0x0C, ...)
        const FOUR_BYTE_NATIVE = 1 << 1;
        /// Supports Deep Power Down / Release (0xB9 / 0xAB)
        const DEEP_POWER_DOWN  = 1 << 2;
        /// Has an SFDP table
        const SFDP             = 1 << 3;
    }
}

/// One erase operation a chip supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EraseBlock {
    /// SPI opcode
    pub opcode: u8,
    /// Bytes erased by one command
    pub size: u32,
}

impl EraseBlock {
    /// Create a new erase block
    pub const fn new(opcode: u8, size: u32) -> Self {
        Self { opcode, size }
    }
}

/// Everything needed to read a particular flash chip
///
/// Profiles are immutable. Built-in ones borrow `'static` data; profiles
/// loaded from chip definition files own theirs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipProfile {
    /// Vendor name (e.g. "Winbond")
    pub vendor: Cow<'static, str>,
    /// Chip model name (e.g. "W25Q64")
    pub name: Cow<'static, str>,
    /// JEDEC ID
    pub jedec_id: JedecId,
    /// Total flash size in bytes
    pub total_size: u32,
    /// Page size in bytes
    pub page_size: u32,
    /// Smallest erase unit in bytes
    pub sector_size: u32,
    /// Opcode used to read the array
    pub read_command: u8,
    /// Erase operations, smallest to largest
    pub erase_blocks: Cow<'static, [EraseBlock]>,
    /// Feature flags
    pub features: Features,
}

impl ChipProfile {
    /// Address width the read command expects
    pub fn address_width(&self) -> AddressWidth {
        if opcodes::is_4byte_read(self.read_command) {
            AddressWidth::FourByte
        } else {
            AddressWidth::ThreeByte
        }
    }

    /// Dummy cycles the read command needs
    pub fn read_dummy_cycles(&self) -> u8 {
        opcodes::read_dummy_cycles(self.read_command)
    }

    /// Number of pages in the chip
    pub fn page_count(&self) -> u32 {
        self.total_size / self.page_size
    }

    /// Check the profile describes a readable geometry
    ///
    /// Sizes must be non-zero powers of two, pages must fit in sectors and
    /// sectors in the chip, and the read command's address width must reach
    /// the whole array.
    pub fn is_consistent(&self) -> bool {
        let pow2 = |v: u32| v != 0 && v.is_power_of_two();
        pow2(self.total_size)
            && pow2(self.page_size)
            && pow2(self.sector_size)
            && self.page_size <= self.sector_size
            && self.sector_size <= self.total_size
            && self.total_size as u64 <= self.address_width().reach()
    }

    /// Vendor and model, for log lines and error context
    pub fn display_name(&self) -> String {
        format!("{} {}", self.vendor, self.name)
    }
}

/// JEDEC manufacturer IDs
pub mod manufacturer {
    /// AMD/Spansion/Cypress
    pub const SPANSION: u8 = 0x01;
    /// EON
    pub const EON: u8 = 0x1C;
    /// Micron / ST / XMC share this bank-one code
    pub const MICRON: u8 = 0x20;
    /// ISSI
    pub const ISSI: u8 = 0x9D;
    /// SST / Microchip
    pub const SST: u8 = 0xBF;
    /// Macronix
    pub const MACRONIX: u8 = 0xC2;
    /// GigaDevice
    pub const GIGADEVICE: u8 = 0xC8;
    /// Winbond
    pub const WINBOND: u8 = 0xEF;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jedec_id_parts() {
        let id = JedecId::from_parts(0xEF, 0x4017);
        assert_eq!(id, JedecId::new([0xEF, 0x40, 0x17]));
        assert_eq!(id.manufacturer(), 0xEF);
        assert_eq!(id.device(), 0x4017);
        assert_eq!(id.to_string(), "EF 4017");
        assert!(!id.is_blank());
        assert!(JedecId::new([0, 0, 0]).is_blank());
    }

    #[test]
    fn test_address_width_from_read_command() {
        let mut p = ChipProfile {
            vendor: "Test".into(),
            name: "T".into(),
            jedec_id: JedecId::new([1, 2, 3]),
            total_size: 32 * 1024 * 1024,
            page_size: 256,
            sector_size: 4096,
            read_command: opcodes::READ,
            erase_blocks: Cow::Borrowed(&[]),
            features: Features::empty(),
        };
        assert_eq!(p.address_width(), AddressWidth::ThreeByte);
        // 32 MiB is out of reach for a 3-byte read
        assert!(!p.is_consistent());

        p.read_command = opcodes::READ_4B;
        assert_eq!(p.address_width(), AddressWidth::FourByte);
        assert!(p.is_consistent());
        assert_eq!(p.page_count(), 131072);
    }
}
