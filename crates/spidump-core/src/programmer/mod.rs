//! Programmer traits and abstractions
//!
//! This module defines the transport seam every programmer implements and
//! the bounded command helper the rest of the crate goes through.

mod traits;
mod transport;

pub use traits::*;
pub use transport::{default_execute_with_vec, send_command, Address};
