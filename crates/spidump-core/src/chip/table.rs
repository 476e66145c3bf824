//! Built-in chip table
//!
//! An immutable list of the SPI NOR parts most commonly found on boards.
//! Lookups never mutate it; extra parts come from chip definition files
//! through [`ChipDatabase`](super::ChipDatabase).

use std::borrow::Cow;

use super::profile::{manufacturer as mfr, ChipProfile, EraseBlock, Features, JedecId};
use crate::spi::opcodes::{BE_52, BE_D8, BE_DC, READ, READ_4B, SE_20, SE_21};

const KIB: u32 = 1024;
const MIB: u32 = 1024 * KIB;

/// 4K/32K/64K erase, the common layout of 3-byte address parts
const ERASE_UNIFORM: &[EraseBlock] = &[
    EraseBlock::new(SE_20, 4 * KIB),
    EraseBlock::new(BE_52, 32 * KIB),
    EraseBlock::new(BE_D8, 64 * KIB),
];

/// 4-byte address erase opcodes of parts above 16 MiB
const ERASE_4B: &[EraseBlock] = &[
    EraseBlock::new(SE_21, 4 * KIB),
    EraseBlock::new(BE_DC, 64 * KIB),
];

/// Parts without a 4K sector erase
const ERASE_64K: &[EraseBlock] = &[EraseBlock::new(BE_D8, 64 * KIB)];

const COMMON: Features = Features::FAST_READ.union(Features::DEEP_POWER_DOWN);

#[allow(clippy::too_many_arguments)]
const fn profile(
    vendor: &'static str,
    name: &'static str,
    id: JedecId,
    total_size: u32,
    sector_size: u32,
    read_command: u8,
    erase_blocks: &'static [EraseBlock],
    features: Features,
) -> ChipProfile {
    ChipProfile {
        vendor: Cow::Borrowed(vendor),
        name: Cow::Borrowed(name),
        jedec_id: id,
        total_size,
        page_size: 256,
        sector_size,
        read_command,
        erase_blocks: Cow::Borrowed(erase_blocks),
        features,
    }
}

/// A 3-byte address part with 4K sectors
const fn spi25(
    vendor: &'static str,
    name: &'static str,
    manufacturer: u8,
    device: u16,
    total_size: u32,
) -> ChipProfile {
    let id = JedecId::from_parts(manufacturer, device);
    profile(vendor, name, id, total_size, 4 * KIB, READ, ERASE_UNIFORM, COMMON)
}

/// A part above 16 MiB read with native 4-byte commands
const fn spi25_4b(
    vendor: &'static str,
    name: &'static str,
    manufacturer: u8,
    device: u16,
    total_size: u32,
) -> ChipProfile {
    let id = JedecId::from_parts(manufacturer, device);
    let features = COMMON.union(Features::FOUR_BYTE_NATIVE);
    profile(vendor, name, id, total_size, 4 * KIB, READ_4B, ERASE_4B, features)
}

/// A part with 64 KiB sectors only
const fn spi25_64k(
    vendor: &'static str,
    name: &'static str,
    manufacturer: u8,
    device: u16,
    total_size: u32,
) -> ChipProfile {
    let id = JedecId::from_parts(manufacturer, device);
    profile(vendor, name, id, total_size, 64 * KIB, READ, ERASE_64K, COMMON)
}

/// Every built-in profile. JEDEC IDs are unique.
pub static CHIPS: &[ChipProfile] = &[
    // Winbond
    spi25("Winbond", "W25Q80", mfr::WINBOND, 0x4014, MIB),
    spi25("Winbond", "W25Q16", mfr::WINBOND, 0x4015, 2 * MIB),
    spi25("Winbond", "W25Q32", mfr::WINBOND, 0x4016, 4 * MIB),
    spi25("Winbond", "W25Q64", mfr::WINBOND, 0x4017, 8 * MIB),
    spi25("Winbond", "W25Q128", mfr::WINBOND, 0x4018, 16 * MIB),
    spi25_4b("Winbond", "W25Q256", mfr::WINBOND, 0x4019, 32 * MIB),
    spi25("Winbond", "W25Q32JW", mfr::WINBOND, 0x6016, 4 * MIB),
    spi25("Winbond", "W25Q64JW", mfr::WINBOND, 0x6017, 8 * MIB),
    spi25("Winbond", "W25Q128JW", mfr::WINBOND, 0x6018, 16 * MIB),
    spi25("Winbond", "W25Q64JV-M", mfr::WINBOND, 0x7017, 8 * MIB),
    spi25("Winbond", "W25Q128JV-M", mfr::WINBOND, 0x7018, 16 * MIB),
    // Macronix
    spi25("Macronix", "MX25L8005", mfr::MACRONIX, 0x2014, MIB),
    spi25("Macronix", "MX25L1605", mfr::MACRONIX, 0x2015, 2 * MIB),
    spi25("Macronix", "MX25L3205", mfr::MACRONIX, 0x2016, 4 * MIB),
    spi25("Macronix", "MX25L6405", mfr::MACRONIX, 0x2017, 8 * MIB),
    spi25("Macronix", "MX25L12805", mfr::MACRONIX, 0x2018, 16 * MIB),
    spi25_4b("Macronix", "MX25L25635F", mfr::MACRONIX, 0x2019, 32 * MIB),
    // GigaDevice
    spi25("GigaDevice", "GD25Q80", mfr::GIGADEVICE, 0x4014, MIB),
    spi25("GigaDevice", "GD25Q16", mfr::GIGADEVICE, 0x4015, 2 * MIB),
    spi25("GigaDevice", "GD25Q32", mfr::GIGADEVICE, 0x4016, 4 * MIB),
    spi25("GigaDevice", "GD25Q64", mfr::GIGADEVICE, 0x4017, 8 * MIB),
    spi25("GigaDevice", "GD25Q128", mfr::GIGADEVICE, 0x4018, 16 * MIB),
    spi25_4b("GigaDevice", "GD25Q256", mfr::GIGADEVICE, 0x4019, 32 * MIB),
    // EON
    spi25("EON", "EN25Q32", mfr::EON, 0x3016, 4 * MIB),
    spi25("EON", "EN25Q64", mfr::EON, 0x3017, 8 * MIB),
    spi25("EON", "EN25Q128", mfr::EON, 0x3018, 16 * MIB),
    spi25("EON", "EN25QH32", mfr::EON, 0x7016, 4 * MIB),
    spi25("EON", "EN25QH64", mfr::EON, 0x7017, 8 * MIB),
    spi25("EON", "EN25QH128", mfr::EON, 0x7018, 16 * MIB),
    // Micron / ST
    spi25_64k("Micron", "M25P80", mfr::MICRON, 0x2014, MIB),
    spi25_64k("Micron", "M25P16", mfr::MICRON, 0x2015, 2 * MIB),
    spi25_64k("Micron", "M25P32", mfr::MICRON, 0x2016, 4 * MIB),
    spi25_64k("Micron", "M25P64", mfr::MICRON, 0x2017, 8 * MIB),
    spi25("Micron", "N25Q032", mfr::MICRON, 0xBA16, 4 * MIB),
    spi25("Micron", "N25Q064", mfr::MICRON, 0xBA17, 8 * MIB),
    spi25("Micron", "N25Q128", mfr::MICRON, 0xBA18, 16 * MIB),
    // ISSI
    spi25("ISSI", "IS25LP032", mfr::ISSI, 0x6016, 4 * MIB),
    spi25("ISSI", "IS25LP064", mfr::ISSI, 0x6017, 8 * MIB),
    spi25("ISSI", "IS25LP128", mfr::ISSI, 0x6018, 16 * MIB),
    // Spansion
    spi25_64k("Spansion", "S25FL032P", mfr::SPANSION, 0x0215, 4 * MIB),
    spi25_64k("Spansion", "S25FL064P", mfr::SPANSION, 0x0216, 8 * MIB),
    // SST
    spi25("SST", "SST25VF016B", mfr::SST, 0x2541, 2 * MIB),
    spi25("SST", "SST25VF032B", mfr::SST, 0x254A, 4 * MIB),
];
