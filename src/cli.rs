//! CLI argument parsing

use crate::programmers;
use clap::{Args, Parser, Subcommand};
use spidump_core::verify::Sampling;
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    format!(
        "Programmer to use [available: {}]",
        programmers::programmer_names_short()
    )
}

#[derive(Parser)]
#[command(name = "spidump")]
#[command(author, version, about = "SPI NOR flash extractor", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to chip database directory or file (.ron)
    /// Defaults to looking in ./chips/vendors/ and /usr/share/spidump/chips/
    #[arg(long, global = true)]
    pub chip_db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Read tuning shared by the commands that talk to a chip
#[derive(Args, Debug, Clone)]
pub struct ReadArgs {
    /// Chip name (optional, auto-detected if not specified)
    #[arg(short, long)]
    pub chip: Option<String>,

    /// Bytes per read command (hex or decimal, multiple of the page size)
    #[arg(long, value_parser = parse_hex_u32)]
    pub chunk_len: Option<u32>,

    /// Retries per chunk after a transient USB error
    #[arg(long, default_value_t = 3)]
    pub retries: u32,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify the connected flash chip
    Probe {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,
    },

    /// Extract the whole chip to a file
    Read {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Output image path; a `.sha256` sidecar is written next to it
        #[arg(short, long)]
        output: PathBuf,

        /// Chunks to read back after extraction: none, all, N or every:N
        #[arg(long, default_value = "none")]
        sample: Sampling,

        #[command(flatten)]
        read: ReadArgs,
    },

    /// Compare the chip contents with an image file
    Verify {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Image file to compare against
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        read: ReadArgs,
    },

    /// Print the CRC-32 and SHA-256 of an image file
    Checksum {
        /// Image file
        file: PathBuf,
    },

    /// List supported programmers and connected devices
    ListProgrammers,

    /// List supported chips
    ListChips {
        /// Filter by vendor
        #[arg(long)]
        vendor: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_read() {
        let cli = Cli::try_parse_from([
            "spidump",
            "-vv",
            "read",
            "-p",
            "dummy:chip=W25Q32",
            "-o",
            "fw.bin",
            "--sample",
            "every:8",
            "--chunk-len",
            "0x800",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Read {
                programmer,
                sample,
                read,
                ..
            } => {
                assert_eq!(programmer, "dummy:chip=W25Q32");
                assert_eq!(sample, Sampling::Every(8));
                assert_eq!(read.chunk_len, Some(0x800));
                assert_eq!(read.retries, 3);
            }
            _ => panic!("expected read"),
        }
    }
}
