//! Whole-chip flash reading
//!
//! [`extract`] reads a chip from address 0 to its end in page-aligned
//! chunks, one bridge transfer per chunk, retrying each chunk under a
//! [`RetryPolicy`](crate::retry::RetryPolicy). The result is all or
//! nothing: a failed or cancelled read never hands back a partial image.

mod cancel;
mod progress;
mod reader;
mod session;

pub use cancel::CancelToken;
pub use progress::{NoProgress, ReadProgress};
pub use reader::{extract, resolve_chunk_len, ReadOptions, ReadStats};
pub use session::ReadSession;
