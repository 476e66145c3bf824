//! Verify command implementation

use std::fs;
use std::path::Path;

use spidump_core::chip::ChipDatabase;
use spidump_core::programmer::SpiMaster;
use spidump_core::verify::{self, Sampling};

use super::read::extract_chip;
use crate::cli::ReadArgs;

/// Read the whole chip and compare it with `input`
pub fn run_verify<M: SpiMaster + ?Sized>(
    master: &mut M,
    db: &ChipDatabase,
    input: &Path,
    args: &ReadArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let expected = fs::read(input)?;
    println!("Read {} bytes from {}", expected.len(), input.display());

    let result = extract_chip(master, db, args, Sampling::None)?;
    let chip_size = result.image.len();
    println!(
        "Found: {} ({} bytes)",
        result.profile.display_name(),
        chip_size
    );

    if expected.len() != chip_size {
        return Err(format!(
            "File size ({} bytes) does not match chip size ({} bytes)",
            expected.len(),
            chip_size
        )
        .into());
    }

    let report = verify::compare(&expected, &result.image);
    match report.first_mismatch {
        None => {
            println!("Verification passed! {}", result.checksum);
            Ok(())
        }
        Some(addr) => Err(format!(
            "Verification failed: {} byte(s) differ. First mismatch at 0x{:08X}: expected 0x{:02X}, got 0x{:02X}",
            report.mismatched_bytes, addr, expected[addr], result.image[addr]
        )
        .into()),
    }
}
