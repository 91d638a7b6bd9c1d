//! JPEG boundary detection.
//!
//! A JPEG is recognised by its JFIF or EXIF APPn header and delimited by the
//! first `FF D9` end-of-image marker that is not immediately followed by an
//! `FF E1` segment (multi-part EXIF files carry several EOI markers).

use crate::matcher::pattern::MaskedPattern;
use crate::types::{Fragment, FragmentKind, DEFAULT_MAX_JPEG_LEN};

pub const JPEG_HEADER_LEN: usize = 12;

// Bytes 4 and 5 hold the APPn segment length and vary per file
const HEADER_MASK: [u8; JPEG_HEADER_LEN] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

/// `FF D8 FF E0 ?? ?? "JFIF" 00 01`
pub const JFIF_HEADER: MaskedPattern<JPEG_HEADER_LEN> = MaskedPattern::new(
    [
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x00, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01,
    ],
    HEADER_MASK,
);

/// `FF D8 FF E1 ?? ?? "Exif" 00 00`
pub const EXIF_HEADER: MaskedPattern<JPEG_HEADER_LEN> = MaskedPattern::new(
    [
        0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x00, 0x45, 0x78, 0x69, 0x66, 0x00, 0x00,
    ],
    HEADER_MASK,
);

const EOI: [u8; 2] = [0xFF, 0xD9];
const APP1: [u8; 2] = [0xFF, 0xE1];

/// What the detector made of one position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegOutcome {
    NoHeader,
    /// Header recognised but no terminator inside the search window
    MissingFooter,
    Found(Fragment),
}

#[derive(Debug, Clone)]
pub struct JpegDetector {
    max_len: usize,
}

impl Default for JpegDetector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_JPEG_LEN)
    }
}

impl JpegDetector {
    /// `max_len` bounds how far past the header a terminator may start
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    /// True if a JFIF or EXIF header starts at `pos`
    #[inline]
    pub fn is_header(data: &[u8], pos: usize) -> bool {
        JFIF_HEADER.matches_at(data, pos) || EXIF_HEADER.matches_at(data, pos)
    }

    /// Returns one past the end of the JPEG whose header is at `header`, or
    /// `None` if no terminator starts within `max_len` bytes of it.
    pub fn find_footer(&self, data: &[u8], header: usize) -> Option<usize> {
        if data.len() < EOI.len() {
            return None;
        }
        let last = (data.len() - EOI.len()).min(header.saturating_add(self.max_len));

        (header..=last)
            .find(|&pos| data[pos..pos + 2] == EOI && !continues_after(data, pos))
            .map(|pos| pos + EOI.len())
    }

    pub fn detect(&self, data: &[u8], pos: usize) -> JpegOutcome {
        if !Self::is_header(data, pos) {
            return JpegOutcome::NoHeader;
        }

        match self.find_footer(data, pos) {
            Some(end) => match Fragment::new(pos, end, FragmentKind::Jpeg) {
                Ok(fragment) => JpegOutcome::Found(fragment),
                Err(_) => JpegOutcome::MissingFooter,
            },
            None => JpegOutcome::MissingFooter,
        }
    }
}

// An EOI followed by APP1 means another image part follows
fn continues_after(data: &[u8], eoi: usize) -> bool {
    eoi + 3 < data.len() && data[eoi + 2..eoi + 4] == APP1
}
