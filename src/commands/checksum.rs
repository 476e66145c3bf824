//! Checksum command implementation

use std::fs;
use std::path::Path;

use spidump_core::verify;

/// Print the checksums of an image file in the same form `read` reports
pub fn run_checksum(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let image = fs::read(file)?;
    let sum = verify::checksum(&image);
    println!("{}: {} bytes", file.display(), image.len());
    println!("CRC32:  {:08x}", sum.crc32);
    println!("SHA256: {}", sum.sha256_hex());
    Ok(())
}
