//! Address width types

/// Address width for SPI commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AddressWidth {
    /// No address phase
    #[default]
    None,
    /// 3-byte (24-bit) address - supports up to 16 MiB
    ThreeByte,
    /// 4-byte (32-bit) address
    FourByte,
}

impl AddressWidth {
    /// Returns the number of address bytes
    pub const fn bytes(&self) -> usize {
        match self {
            Self::None => 0,
            Self::ThreeByte => 3,
            Self::FourByte => 4,
        }
    }

    /// Returns the size of the address space reachable with this width
    pub const fn reach(&self) -> u64 {
        match self {
            Self::None => 0,
            Self::ThreeByte => 1 << 24,
            Self::FourByte => 1 << 32,
        }
    }

    /// Encode an address big-endian into the start of `buf`
    pub fn encode(&self, address: u32, buf: &mut [u8]) {
        let bytes = address.to_be_bytes();
        let n = self.bytes();
        buf[..n].copy_from_slice(&bytes[4 - n..]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        let mut buf = [0u8; 4];
        AddressWidth::ThreeByte.encode(0x12_3456, &mut buf);
        assert_eq!(&buf[..3], &[0x12, 0x34, 0x56]);

        AddressWidth::FourByte.encode(0x0123_4567, &mut buf);
        assert_eq!(buf, [0x01, 0x23, 0x45, 0x67]);
    }

    #[test]
    fn test_reach() {
        assert_eq!(AddressWidth::ThreeByte.reach(), 16 * 1024 * 1024);
        assert_eq!(AddressWidth::None.bytes(), 0);
    }
}
