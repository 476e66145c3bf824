//! Chip database for lookup by JEDEC ID
//!
//! The database always contains the built-in [`CHIPS`] table. Additional
//! profiles can be loaded from RON vendor files before the database is
//! handed to identification; lookups take `&self` only.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::Path;

use super::profile::{ChipProfile, EraseBlock, Features, JedecId};
use super::table::CHIPS;
use crate::spi::opcodes;

/// Error type for chip database operations
#[derive(Debug, thiserror::Error)]
pub enum ChipDbError {
    /// I/O error reading files
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// RON parsing error
    #[error("parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// A definition describes an impossible chip
    #[error("validation error: {0}")]
    Validation(String),
}

// ============================================================================
// RON deserialization types (intermediate format)
// ============================================================================

/// Size specification with human-readable units (for RON parsing)
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub enum Size {
    /// Size in bytes
    B(u32),
    /// Size in kibibytes (1024 bytes)
    KiB(u32),
    /// Size in mebibytes (1024 * 1024 bytes)
    MiB(u32),
}

impl Size {
    /// Convert to bytes, `None` if the size does not fit in 32 bits
    pub fn to_bytes(self) -> Option<u32> {
        match self {
            Size::B(n) => Some(n),
            Size::KiB(n) => n.checked_mul(1024),
            Size::MiB(n) => n.checked_mul(1024 * 1024),
        }
    }
}

/// Feature flags (RON format)
#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
#[serde(default)]
struct FeaturesDef {
    fast_read: bool,
    four_byte_native: bool,
    deep_power_down: bool,
    sfdp: bool,
}

impl From<FeaturesDef> for Features {
    fn from(def: FeaturesDef) -> Self {
        let mut f = Features::empty();
        f.set(Features::FAST_READ, def.fast_read);
        f.set(Features::FOUR_BYTE_NATIVE, def.four_byte_native);
        f.set(Features::DEEP_POWER_DOWN, def.deep_power_down);
        f.set(Features::SFDP, def.sfdp);
        f
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
struct EraseBlockDef {
    opcode: u8,
    size: Size,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct ChipDef {
    name: String,
    device_id: u16,
    total_size: Size,
    #[serde(default = "default_page_size")]
    page_size: Size,
    #[serde(default)]
    sector_size: Option<Size>,
    #[serde(default)]
    read_command: Option<u8>,
    #[serde(default)]
    erase_blocks: Vec<EraseBlockDef>,
    #[serde(default)]
    features: FeaturesDef,
}

fn default_page_size() -> Size {
    Size::B(256)
}

/// Vendor definition containing multiple chips
#[derive(Debug, Clone, serde::Deserialize)]
struct VendorDef {
    vendor: String,
    manufacturer_id: u8,
    chips: Vec<ChipDef>,
}

impl ChipDef {
    fn into_profile(self, vendor: &str, manufacturer: u8) -> Result<ChipProfile, ChipDbError> {
        let bytes = |size: Size, what: &str| {
            size.to_bytes().ok_or_else(|| {
                ChipDbError::Validation(format!(
                    "{} {}: {} {:?} exceeds 4 GiB",
                    vendor, self.name, what, size
                ))
            })
        };

        let total_size = bytes(self.total_size, "total_size")?;
        let page_size = bytes(self.page_size, "page_size")?;
        let mut erase_blocks = Vec::with_capacity(self.erase_blocks.len());
        for eb in &self.erase_blocks {
            erase_blocks.push(EraseBlock::new(eb.opcode, bytes(eb.size, "erase block")?));
        }
        erase_blocks.sort_by_key(|eb| eb.size);

        let sector_size = match (self.sector_size, erase_blocks.first()) {
            (Some(size), _) => bytes(size, "sector_size")?,
            (None, Some(eb)) => eb.size,
            (None, None) => 4096,
        };

        // Parts above 16 MiB cannot be read with a 3-byte address
        let read_command = self.read_command.unwrap_or(if total_size > 16 * 1024 * 1024 {
            opcodes::READ_4B
        } else {
            opcodes::READ
        });

        let profile = ChipProfile {
            vendor: Cow::Owned(vendor.to_string()),
            name: Cow::Owned(self.name),
            jedec_id: JedecId::from_parts(manufacturer, self.device_id),
            total_size,
            page_size,
            sector_size,
            read_command,
            erase_blocks: Cow::Owned(erase_blocks),
            features: self.features.into(),
        };

        if !profile.is_consistent() {
            return Err(ChipDbError::Validation(format!(
                "{} {}: inconsistent geometry (size {}, page {}, sector {}, read 0x{:02X})",
                vendor,
                profile.name,
                profile.total_size,
                profile.page_size,
                profile.sector_size,
                profile.read_command
            )));
        }

        Ok(profile)
    }
}

// ============================================================================
// Chip database
// ============================================================================

/// Chip database: the built-in table plus any loaded definitions
#[derive(Debug, Clone, Default)]
pub struct ChipDatabase {
    extra: Vec<ChipProfile>,
}

impl ChipDatabase {
    /// Create a database holding only the built-in table
    pub fn builtin() -> Self {
        Self { extra: Vec::new() }
    }

    /// Load chip definitions from a single RON file
    pub fn load_file(&mut self, path: &Path) -> Result<usize, ChipDbError> {
        let content = fs::read_to_string(path)?;
        self.load_ron(&content)
    }

    /// Load chip definitions from a RON string
    ///
    /// Returns the number of profiles added. Definitions whose JEDEC ID is
    /// already known are skipped with a warning; the first definition wins
    /// and built-in entries always come first.
    pub fn load_ron(&mut self, content: &str) -> Result<usize, ChipDbError> {
        let vendor_def: VendorDef = ron::from_str(content)?;

        let mut profiles = Vec::with_capacity(vendor_def.chips.len());
        for chip_def in vendor_def.chips {
            profiles.push(chip_def.into_profile(&vendor_def.vendor, vendor_def.manufacturer_id)?);
        }

        let mut added = 0;
        for profile in profiles {
            if let Some(existing) = self.find_by_jedec_id(profile.jedec_id) {
                log::warn!(
                    "Ignoring {}: JEDEC ID {} already defined by {}",
                    profile.display_name(),
                    profile.jedec_id,
                    existing.display_name()
                );
                continue;
            }
            self.extra.push(profile);
            added += 1;
        }

        Ok(added)
    }

    /// Load all RON files from a directory
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, ChipDbError> {
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "ron"))
            .collect();
        // Directory order is unspecified; sort so duplicates resolve the same way
        paths.sort();

        let mut total = 0;
        for path in paths {
            total += self.load_file(&path)?;
        }
        Ok(total)
    }

    /// Number of profiles, built-in included
    pub fn len(&self) -> usize {
        CHIPS.len() + self.extra.len()
    }

    /// Always false: the built-in table is never empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of profiles loaded from files
    pub fn loaded_len(&self) -> usize {
        self.extra.len()
    }

    /// Iterate over all profiles, built-in first
    pub fn iter(&self) -> impl Iterator<Item = &ChipProfile> {
        CHIPS.iter().chain(self.extra.iter())
    }

    /// Find a chip by its JEDEC ID
    pub fn find_by_jedec_id(&self, id: JedecId) -> Option<&ChipProfile> {
        self.iter().find(|c| c.jedec_id == id)
    }

    /// Find a chip by exact model name (case-insensitive)
    pub fn find_by_name(&self, name: &str) -> Option<&ChipProfile> {
        self.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Find chips by vendor (case-insensitive partial match)
    pub fn find_by_vendor(&self, vendor: &str) -> Vec<&ChipProfile> {
        let vendor_lower = vendor.to_lowercase();
        self.iter()
            .filter(|c| c.vendor.to_lowercase().contains(&vendor_lower))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XMC_RON: &str = r#"
        (
            vendor: "XMC",
            manufacturer_id: 0x20,
            chips: [
                (
                    name: "XM25QH64A",
                    device_id: 0x7017,
                    total_size: MiB(8),
                    erase_blocks: [
                        (opcode: 0xD8, size: KiB(64)),
                        (opcode: 0x20, size: KiB(4)),
                    ],
                    features: (fast_read: true),
                ),
                (
                    name: "XM25QH256B",
                    device_id: 0x6019,
                    total_size: MiB(32),
                ),
            ],
        )
    "#;

    #[test]
    fn test_builtin_lookup() {
        let db = ChipDatabase::builtin();
        let chip = db.find_by_jedec_id(JedecId::new([0xEF, 0x40, 0x17])).unwrap();
        assert_eq!(chip.name, "W25Q64");
        assert_eq!(chip.total_size, 8 * 1024 * 1024);
        assert!(db.find_by_jedec_id(JedecId::new([0x12, 0x34, 0x56])).is_none());
        assert_eq!(db.find_by_name("w25q128").unwrap().jedec_id.device(), 0x4018);
        assert!(!db.find_by_vendor("winbond").is_empty());
    }

    #[test]
    fn test_load_ron() {
        let mut db = ChipDatabase::builtin();
        let builtin = db.len();
        assert_eq!(db.load_ron(XMC_RON).unwrap(), 2);
        assert_eq!(db.len(), builtin + 2);
        assert_eq!(db.loaded_len(), 2);

        let chip = db.find_by_jedec_id(JedecId::from_parts(0x20, 0x7017)).unwrap();
        assert_eq!(chip.vendor, "XMC");
        assert_eq!(chip.page_size, 256);
        // Erase blocks are sorted and the smallest becomes the sector
        assert_eq!(chip.sector_size, 4096);
        assert_eq!(chip.erase_blocks[0].opcode, 0x20);
        assert_eq!(chip.read_command, opcodes::READ);
        assert!(chip.features.contains(Features::FAST_READ));

        let big = db.find_by_name("XM25QH256B").unwrap();
        assert_eq!(big.read_command, opcodes::READ_4B);
    }

    #[test]
    fn test_load_ron_keeps_builtin_on_collision() {
        let ron = r#"(vendor: "Clone", manufacturer_id: 0xEF, chips: [
            (name: "FAKE64", device_id: 0x4017, total_size: MiB(8)),
        ])"#;
        let mut db = ChipDatabase::builtin();
        assert_eq!(db.load_ron(ron).unwrap(), 0);
        let chip = db.find_by_jedec_id(JedecId::from_parts(0xEF, 0x4017)).unwrap();
        assert_eq!(chip.name, "W25Q64");
    }

    #[test]
    fn test_load_ron_rejects_bad_geometry() {
        let ron = r#"(vendor: "Bad", manufacturer_id: 0x42, chips: [
            (name: "ODD", device_id: 0x0001, total_size: B(3000)),
        ])"#;
        let mut db = ChipDatabase::builtin();
        assert!(matches!(db.load_ron(ron), Err(ChipDbError::Validation(_))));
        assert_eq!(db.loaded_len(), 0);
    }

    #[test]
    fn test_load_ron_rejects_oversized_chip() {
        let ron = r#"(vendor: "Big", manufacturer_id: 0x42, chips: [
            (name: "HUGE", device_id: 0x0001, total_size: MiB(4096)),
        ])"#;
        let mut db = ChipDatabase::builtin();
        match db.load_ron(ron) {
            Err(ChipDbError::Validation(msg)) => assert!(msg.contains("HUGE")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(db.loaded_len(), 0);
    }

    #[test]
    fn test_size_conversion() {
        assert_eq!(Size::B(256).to_bytes(), Some(256));
        assert_eq!(Size::KiB(4).to_bytes(), Some(4096));
        assert_eq!(Size::MiB(16).to_bytes(), Some(16777216));
        assert_eq!(Size::MiB(4096).to_bytes(), None);
        assert_eq!(Size::KiB(4 * 1024 * 1024).to_bytes(), None);
    }
}
