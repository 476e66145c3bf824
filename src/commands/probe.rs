//! Probe command implementation

use spidump_core::chip::{self, ChipDatabase, ChipProfile};
use spidump_core::programmer::SpiMaster;
use spidump_core::retry::RetryPolicy;

/// Identify the chip behind `master` and print its profile
pub fn run_probe<M: SpiMaster + ?Sized>(
    master: &mut M,
    db: &ChipDatabase,
) -> Result<(), Box<dyn std::error::Error>> {
    match chip::identify(master, db, &RetryPolicy::default()) {
        Ok(profile) => {
            println!("Found flash chip:");
            print_profile(&profile);
            Ok(())
        }
        Err(e) => {
            eprintln!("Probe failed: {}", e);
            Err(Box::new(e))
        }
    }
}

pub(crate) fn print_profile(profile: &ChipProfile) {
    println!("  Vendor:   {}", profile.vendor);
    println!("  Name:     {}", profile.name);
    println!(
        "  Size:     {} bytes ({} KiB)",
        profile.total_size,
        profile.total_size / 1024
    );
    println!("  JEDEC ID: {}", profile.jedec_id);
    println!(
        "  Page:     {} bytes, sector {} bytes",
        profile.page_size, profile.sector_size
    );
    println!(
        "  Read:     opcode 0x{:02X}, {}-byte address",
        profile.read_command,
        profile.address_width().bytes()
    );
}
