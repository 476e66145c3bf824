//! CLI command implementations
//!
//! Commands that talk to a chip take an opened programmer and the chip
//! database; everything else works on files only.

mod checksum;
mod list;
mod probe;
mod progress;
mod read;
mod verify;

pub use checksum::run_checksum;
pub use list::{list_chips, list_programmers};
pub use probe::run_probe;
pub use read::run_read;
pub use verify::run_verify;
