//! Byte comparison of two images

/// Result of comparing an image with what the chip holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompareReport {
    /// Number of differing bytes
    pub mismatched_bytes: usize,
    /// Offset of the first differing byte
    pub first_mismatch: Option<usize>,
}

impl CompareReport {
    /// True if both sides were identical
    pub fn is_match(&self) -> bool {
        self.mismatched_bytes == 0
    }
}

/// Compare `expected` with `actual` byte by byte
///
/// Slices of different lengths are compared over the shorter one; the
/// caller checks lengths first.
pub fn compare(expected: &[u8], actual: &[u8]) -> CompareReport {
    let mut report = CompareReport::default();
    for (i, (e, a)) in expected.iter().zip(actual).enumerate() {
        if e != a {
            report.first_mismatch.get_or_insert(i);
            report.mismatched_bytes += 1;
        }
    }
    report
}
