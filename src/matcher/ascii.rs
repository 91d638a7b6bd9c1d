//! Printable ASCII run detection with a forward-only suppression boundary.

use crate::types::{Fragment, FragmentKind, DEFAULT_MIN_TEXT_LEN};

/// Printable ASCII, space through tilde
#[inline]
pub fn is_printable(byte: u8) -> bool {
    (0x20..=0x7E).contains(&byte)
}

/// One past the last printable byte of the run starting at `pos`
pub fn printable_run_end(data: &[u8], pos: usize) -> usize {
    let rest = data.get(pos..).unwrap_or(&[]);
    pos + rest
        .iter()
        .position(|&b| !is_printable(b))
        .unwrap_or(rest.len())
}

/// Finds long printable runs. Every run is measured once: after a run has been
/// examined, positions inside it are ignored until the cursor passes its end.
#[derive(Debug, Clone)]
pub struct AsciiDetector {
    min_len: usize,
    boundary: usize,
}

impl Default for AsciiDetector {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_TEXT_LEN)
    }
}

impl AsciiDetector {
    pub fn new(min_len: usize) -> Self {
        Self {
            min_len: min_len.max(1),
            boundary: 0,
        }
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    /// Offset below which nothing is re-examined
    pub fn boundary(&self) -> usize {
        self.boundary
    }

    pub fn detect(&mut self, data: &[u8], pos: usize) -> Option<Fragment> {
        if pos < self.boundary {
            return None;
        }

        let end = printable_run_end(data, pos);
        self.boundary = self.boundary.max(end);

        if end - pos >= self.min_len {
            Fragment::new(pos, end, FragmentKind::Text).ok()
        } else {
            None
        }
    }
}
