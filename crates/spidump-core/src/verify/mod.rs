//! Image checksums and read-back verification
//!
//! Every extracted image gets a [`Checksum`]. Optionally a [`Sampling`] of
//! its chunks is read from the chip a second time and compared byte for
//! byte; any difference is reported as an
//! [`IntegrityError`](crate::error::IntegrityError). The verifier only
//! signals. Whether to re-extract is left to the caller.

mod checksum;
mod compare;
mod sample;

pub use checksum::{checksum, Checksum};
pub use compare::{compare, CompareReport};
pub use sample::{select_chunks, verify_image, verify_sample, Sampling};
