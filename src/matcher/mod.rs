//! Signature detectors.
//!
//! Each detector is offered one position of the buffer at a time and answers
//! with at most one fragment starting there. Detectors never move the scan
//! cursor.

pub mod ascii;
pub mod jpeg;
pub mod pattern;

pub use ascii::{is_printable, printable_run_end, AsciiDetector};
pub use jpeg::{JpegDetector, JpegOutcome, EXIF_HEADER, JFIF_HEADER};
pub use pattern::{matches_masked, MaskedPattern};
