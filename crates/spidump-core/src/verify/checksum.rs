//! CRC-32 and SHA-256 of an image

use core::fmt;

use sha2::{Digest, Sha256};

/// Checksums of an extracted image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum {
    /// CRC-32 (IEEE 802.3)
    pub crc32: u32,
    /// SHA-256 digest
    pub sha256: [u8; 32],
}

impl Checksum {
    /// Lowercase hex SHA-256, as printed by `sha256sum`
    pub fn sha256_hex(&self) -> String {
        self.sha256.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// A `sha256sum` compatible line for `file_name`
    pub fn sidecar_line(&self, file_name: &str) -> String {
        format!("{}  {}\n", self.sha256_hex(), file_name)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CRC32 {:08x} SHA256 {}", self.crc32, self.sha256_hex())
    }
}

/// Compute the checksums of `image`
pub fn checksum(image: &[u8]) -> Checksum {
    let mut hasher = Sha256::new();
    hasher.update(image);
    let mut sha256 = [0u8; 32];
    sha256.copy_from_slice(&hasher.finalize());

    Checksum {
        crc32: crc::crc32::checksum_ieee(image),
        sha256,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        let c = checksum(b"123456789");
        assert_eq!(c.crc32, 0xCBF4_3926);

        let empty = checksum(b"");
        assert_eq!(empty.crc32, 0);
        assert_eq!(
            empty.sha256_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sidecar_format() {
        let c = checksum(b"abc");
        assert_eq!(
            c.sidecar_line("dump.bin"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad  dump.bin\n"
        );
        assert!(c.to_string().starts_with("CRC32 352441c2 SHA256 ba7816bf"));
    }
}
