//! Signature-based file carver for raw disk images.
//!
//! Every byte offset of the image is offered to a set of detectors:
//! - JPEG: JFIF/EXIF header, terminated by the first `FF D9` not followed by `FF E1`
//! - Text: runs of at least 1024 printable ASCII bytes
//!
//! Matches are written out as individual artifacts by a [`FragmentSink`], which
//! also emits one shell command per artifact for external post-processing.

pub mod cli;
pub mod disk;
pub mod error;
pub mod matcher;
pub mod recovery;
pub mod report;
pub mod scanner;
pub mod types;

// Re-export commonly used types
pub use types::{Offset, Size};
pub use types::{Fragment, FragmentKind, ScanConfig, ScanProgress, ScanStats, SinkConfig};
pub use disk::DiskImage;
pub use matcher::{AsciiDetector, JpegDetector, JpegOutcome, MaskedPattern};
pub use recovery::{DirectorySink, FragmentSink, WrittenFragment};
pub use report::{Manifest, ManifestEntry};
pub use scanner::{ScanOutcome, Scanner};
pub use error::{RecoveryError, Result};
