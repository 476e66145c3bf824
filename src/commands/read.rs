//! Read command implementation

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use signal_hook::consts::signal;
use signal_hook::SigId;

use spidump_core::chip::ChipDatabase;
use spidump_core::extract::{self, ExtractOptions, ExtractionResult, Verification};
use spidump_core::flash::{CancelToken, ReadOptions};
use spidump_core::programmer::SpiMaster;
use spidump_core::retry::RetryPolicy;
use spidump_core::verify::Sampling;

use super::progress::BarProgress;
use crate::cli::ReadArgs;

/// `path` with `suffix` appended to the file name
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

/// Write `data` to `path` through a `.part` file
///
/// A truncated image never appears under the final name, and the `.part`
/// file is removed again if the write or the rename fails.
fn write_atomically(path: &Path, data: &[u8]) -> io::Result<()> {
    let part = with_suffix(path, ".part");
    let result = fs::write(&part, data).and_then(|()| fs::rename(&part, path));
    if result.is_err() {
        if let Err(e) = fs::remove_file(&part) {
            log::debug!("Could not remove {}: {}", part.display(), e);
        }
    }
    result
}

/// Routes Ctrl-C to a cancel token while alive
///
/// The first SIGINT sets the token so the read stops at the next chunk
/// boundary; a second one terminates the process.
struct SigintGuard {
    ids: [SigId; 2],
}

impl SigintGuard {
    fn install(cancel: &CancelToken) -> io::Result<Self> {
        let exit = signal_hook::flag::register_conditional_default(signal::SIGINT, cancel.flag())?;
        let flag = match signal_hook::flag::register(signal::SIGINT, cancel.flag()) {
            Ok(id) => id,
            Err(e) => {
                signal_hook::low_level::unregister(exit);
                return Err(e);
            }
        };
        Ok(Self { ids: [exit, flag] })
    }
}

impl Drop for SigintGuard {
    fn drop(&mut self) {
        for id in self.ids {
            signal_hook::low_level::unregister(id);
        }
    }
}

impl ReadArgs {
    /// Chunking and retry settings for the core reader
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            retry: RetryPolicy::with_retries(self.retries),
            chunk_len: self.chunk_len,
        }
    }
}

/// Identify (or take the forced chip) and extract it
pub(crate) fn extract_chip<M: SpiMaster + ?Sized>(
    master: &mut M,
    db: &ChipDatabase,
    args: &ReadArgs,
    sampling: Sampling,
) -> Result<ExtractionResult, Box<dyn std::error::Error>> {
    let opts = ExtractOptions {
        read: args.read_options(),
        sampling,
    };
    let mut progress = BarProgress::new();
    let cancel = CancelToken::new();
    let _sigint = SigintGuard::install(&cancel)?;

    let result = match &args.chip {
        Some(name) => {
            let profile = db
                .find_by_name(name)
                .ok_or_else(|| format!("Unknown chip: {}", name))?
                .clone();
            log::info!("Skipping identification, using {}", profile.display_name());
            extract::extract_profile(master, profile, &opts, &mut progress, &cancel, Instant::now())
        }
        None => extract::extract_image(master, db, &opts, &mut progress, &cancel),
    };

    result.map_err(|e| {
        progress.abandon();
        e.into()
    })
}

/// Run the read command
pub fn run_read<M: SpiMaster + ?Sized>(
    master: &mut M,
    db: &ChipDatabase,
    output: &Path,
    sampling: Sampling,
    args: &ReadArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = extract_chip(master, db, args, sampling)?;

    println!(
        "Found: {} ({} bytes)",
        result.profile.display_name(),
        result.profile.total_size
    );

    write_atomically(output, &result.image)?;

    let file_name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| output.display().to_string());
    let sidecar = with_suffix(output, ".sha256");
    fs::write(&sidecar, result.checksum.sidecar_line(&file_name))?;

    let secs = result.duration.as_secs_f64();
    println!(
        "Wrote {} bytes to {} in {:.1}s ({:.1} KiB/s)",
        result.image.len(),
        output.display(),
        secs,
        result.image.len() as f64 / 1024.0 / secs.max(f64::EPSILON)
    );
    println!("CRC32:  {:08x}", result.checksum.crc32);
    println!("SHA256: {}", result.checksum.sha256_hex());
    if result.stats.retries > 0 {
        println!("Retried transfers: {}", result.stats.retries);
    }

    match &result.verification {
        Verification::NotPerformed => Ok(()),
        Verification::Verified { chunks } => {
            println!("Verified {} sampled chunk(s)", chunks);
            Ok(())
        }
        Verification::Unverified(e) => {
            eprintln!("WARNING: image is UNVERIFIED: {}", e);
            for m in &e.mismatches {
                eprintln!(
                    "  chunk 0x{:08X}+{}: first difference at 0x{:08X} (read 0x{:02X}, re-read 0x{:02X})",
                    m.offset, m.len, m.first_diff, m.expected, m.actual
                );
            }
            Err(format!(
                "Read-back of {} differs; check the clip and read again",
                output.display()
            )
            .into())
        }
    }
}
