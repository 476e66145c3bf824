//! Standard JEDEC SPI flash opcodes
//!
//! Only the commands needed to wake, identify and read a chip are listed,
//! plus the erase opcodes that chip profiles refer to.

// ============================================================================
// Identification and power
// ============================================================================

/// Read JEDEC ID (manufacturer + device ID)
pub const RDID: u8 = 0x9F;
/// Read Electronic Signature / Release from Deep Power Down
pub const RES: u8 = 0xAB;
/// Deep Power Down
pub const DP: u8 = 0xB9;
/// Read Status Register 1
pub const RDSR: u8 = 0x05;

// ============================================================================
// Read commands
// ============================================================================

/// Read Data, 3-byte address
pub const READ: u8 = 0x03;
/// Fast Read, 3-byte address, 8 dummy cycles
pub const FAST_READ: u8 = 0x0B;
/// Read Data, 4-byte address
pub const READ_4B: u8 = 0x13;
/// Fast Read, 4-byte address, 8 dummy cycles
pub const FAST_READ_4B: u8 = 0x0C;

// ============================================================================
// Erase commands (referenced by chip profiles)
// ============================================================================

/// Sector Erase 4 KiB
pub const SE_20: u8 = 0x20;
/// Block Erase 32 KiB
pub const BE_52: u8 = 0x52;
/// Block Erase 64 KiB
pub const BE_D8: u8 = 0xD8;
/// Sector Erase 4 KiB, 4-byte address
pub const SE_21: u8 = 0x21;
/// Block Erase 64 KiB, 4-byte address
pub const BE_DC: u8 = 0xDC;

/// Returns true if `opcode` is a read command taking a 4-byte address
pub const fn is_4byte_read(opcode: u8) -> bool {
    matches!(opcode, READ_4B | FAST_READ_4B)
}

/// Number of dummy clock cycles a read opcode needs after the address
pub const fn read_dummy_cycles(opcode: u8) -> u8 {
    match opcode {
        FAST_READ | FAST_READ_4B => 8,
        _ => 0,
    }
}
