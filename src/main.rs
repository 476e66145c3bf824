//! spidump - Extract firmware images from SPI NOR flash chips
//!
//! Reads a whole chip through a CH341A USB programmer: the chip is
//! identified by its JEDEC ID, read in bounded chunks with retry on
//! transient USB errors, checksummed and optionally read back in part to
//! confirm the image is stable.

mod cli;
mod commands;
mod programmers;

use clap::Parser;
use cli::{Cli, Commands};
use spidump_core::chip::ChipDatabase;
use std::path::{Path, PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    // Load chip database
    let db = match load_chip_database(cli.chip_db.as_deref()) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to load chip database: {}", e);
            std::process::exit(1);
        }
    };

    log::info!(
        "Loaded {} chip definitions ({} from files)",
        db.len(),
        db.loaded_len()
    );

    match cli.command {
        Commands::Probe { programmer } => {
            let mut master = programmers::open_programmer(&programmer, &db)?;
            commands::run_probe(&mut master, &db)
        }
        Commands::Read {
            programmer,
            output,
            sample,
            read,
        } => {
            let mut master = programmers::open_programmer(&programmer, &db)?;
            commands::run_read(&mut master, &db, &output, sample, &read)
        }
        Commands::Verify {
            programmer,
            input,
            read,
        } => {
            let mut master = programmers::open_programmer(&programmer, &db)?;
            commands::run_verify(&mut master, &db, &input, &read)
        }
        Commands::Checksum { file } => commands::run_checksum(&file),
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
        Commands::ListChips { vendor } => {
            commands::list_chips(&db, vendor.as_deref());
            Ok(())
        }
    }
}

/// Load the chip database from the specified path or default locations
///
/// The built-in table is always present; files only add to it.
fn load_chip_database(path: Option<&Path>) -> Result<ChipDatabase, Box<dyn std::error::Error>> {
    let mut db = ChipDatabase::builtin();

    if let Some(path) = path {
        // User specified a path
        if path.is_dir() {
            db.load_dir(path)?;
        } else if path.is_file() {
            db.load_file(path)?;
        } else {
            return Err(format!("Chip database path not found: {}", path.display()).into());
        }
    } else {
        let default_paths = [
            PathBuf::from("chips/vendors"),
            PathBuf::from("/usr/share/spidump/chips"),
            PathBuf::from("/usr/local/share/spidump/chips"),
        ];

        for dir in &default_paths {
            if dir.is_dir() {
                match db.load_dir(dir) {
                    Ok(count) => log::debug!("Loaded {} chips from {}", count, dir.display()),
                    Err(e) => log::warn!("Failed to load chips from {}: {}", dir.display(), e),
                }
            }
        }
    }

    Ok(db)
}
