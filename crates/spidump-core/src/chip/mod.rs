//! Flash chip profiles, database and identification
//!
//! This module provides types for describing flash chips, the immutable
//! built-in table of known parts, and the JEDEC ID based identification
//! that maps a connected chip onto one of them.

mod database;
mod identify;
mod profile;
mod table;

pub use database::*;
pub use identify::*;
pub use profile::*;
pub use table::CHIPS;
