//! State of one in-progress extraction

use crate::chip::ChipProfile;
use crate::error::Result;

/// One extraction in progress
///
/// Owns the target buffer for the whole chip. Chunks are filled strictly in
/// address order and `bytes_read` only moves forward once a chunk has been
/// read successfully, so it never exceeds `total_size`. Dropping an
/// unfinished session discards its buffer; the image only leaves through
/// [`into_image`](Self::into_image).
#[derive(Debug)]
pub struct ReadSession<'p> {
    profile: &'p ChipProfile,
    bytes_read: u32,
    buffer: Vec<u8>,
}

impl<'p> ReadSession<'p> {
    /// Start a session for `profile` with a zeroed buffer of the chip's size
    pub fn new(profile: &'p ChipProfile) -> Self {
        Self {
            profile,
            bytes_read: 0,
            buffer: vec![0u8; profile.total_size as usize],
        }
    }

    /// Bytes read so far, which is also the address of the next chunk
    pub fn bytes_read(&self) -> u32 {
        self.bytes_read
    }

    /// Bytes left to read
    pub fn remaining(&self) -> u32 {
        self.profile.total_size - self.bytes_read
    }

    /// True once every byte of the chip has been read
    pub fn is_complete(&self) -> bool {
        self.bytes_read == self.profile.total_size
    }

    /// Fill the next chunk of at most `chunk_len` bytes
    ///
    /// `read` gets the chunk's flash address and its slot in the buffer.
    /// On success the session advances past the chunk; on error it stays
    /// where it was and the error is returned.
    pub fn fill_next<T, F>(&mut self, chunk_len: u32, read: F) -> Result<T>
    where
        F: FnOnce(u32, &mut [u8]) -> Result<T>,
    {
        let addr = self.bytes_read;
        let len = chunk_len.min(self.remaining());
        let start = addr as usize;
        let value = read(addr, &mut self.buffer[start..start + len as usize])?;
        self.bytes_read += len;
        Ok(value)
    }

    /// Hand over the finished image
    pub fn into_image(self) -> Vec<u8> {
        debug_assert!(self.is_complete());
        self.buffer
    }
}
