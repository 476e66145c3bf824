//! List commands implementation

use spidump_core::chip::ChipDatabase;

use crate::programmers;

/// List all supported programmers, and any CH341A currently plugged in
pub fn list_programmers() {
    println!("Supported programmers:");
    println!();
    for p in programmers::available_programmers() {
        let aliases = if p.aliases.is_empty() {
            String::new()
        } else {
            format!(" (aliases: {})", p.aliases.join(", "))
        };
        println!("  {:10} - {}{}", p.name, p.description, aliases);
    }

    #[cfg(feature = "ch341a")]
    list_connected_ch341a();
}

#[cfg(feature = "ch341a")]
fn list_connected_ch341a() {
    match spidump_ch341a::Ch341a::list_devices() {
        Ok(devices) if devices.is_empty() => {
            println!();
            println!("No CH341A connected");
        }
        Ok(devices) => {
            println!();
            println!("Connected:");
            for d in devices {
                println!("  {}", d);
            }
        }
        Err(e) => log::warn!("Could not enumerate USB devices: {}", e),
    }
}

/// List all supported chips
pub fn list_chips(db: &ChipDatabase, vendor_filter: Option<&str>) {
    println!("Supported flash chips:");
    println!();
    println!(
        "{:<12} {:<20} {:>10} {:>10} {:>6}",
        "Vendor", "Name", "Size", "JEDEC ID", "Read"
    );
    println!("{}", "-".repeat(62));

    let chips = match vendor_filter {
        Some(vendor) => db.find_by_vendor(vendor),
        None => db.iter().collect(),
    };

    for chip in &chips {
        println!(
            "{:<12} {:<20} {:>10} {:>10} {:>6}",
            chip.vendor,
            chip.name,
            format_size(chip.total_size),
            chip.jedec_id.to_string(),
            format!("0x{:02X}", chip.read_command)
        );
    }

    println!();
    println!("{} chip(s)", chips.len());
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
