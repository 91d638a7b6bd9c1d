use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RecoveryError, Result};

/// Newtype wrapper for byte offsets in disk images
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Offset(pub u64);

impl Offset {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn checked_add(&self, size: Size) -> Option<Offset> {
        self.0.checked_add(size.0).map(Offset)
    }
}

impl From<usize> for Offset {
    fn from(value: usize) -> Self {
        Self(value as u64)
    }
}

impl std::fmt::Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Newtype wrapper for sizes in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Size(pub u64);

impl Size {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn as_mib(&self) -> u64 {
        self.0 / (1024 * 1024)
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} bytes", self.0)
    }
}

/// File formats the carver knows how to delimit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentKind {
    Jpeg,
    Text,
}

impl FragmentKind {
    pub const ALL: [FragmentKind; 2] = [FragmentKind::Jpeg, FragmentKind::Text];

    /// Tag used both as the artifact prefix and its extension
    pub fn tag(&self) -> &'static str {
        match self {
            FragmentKind::Jpeg => "jpg",
            FragmentKind::Text => "txt",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(FragmentKind::Jpeg),
            "txt" | "ascii" => Some(FragmentKind::Text),
            _ => None,
        }
    }
}

impl std::fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// A half-open byte range `[start, end)` of the scanned buffer believed to be one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    start: usize,
    end: usize,
    kind: FragmentKind,
}

impl Fragment {
    /// Create a fragment; empty or inverted ranges are rejected
    pub fn new(start: usize, end: usize, kind: FragmentKind) -> Result<Self> {
        if start >= end {
            return Err(RecoveryError::InvalidFragment {
                start: start as u64,
                end: end as u64,
            });
        }
        Ok(Self { start, end, kind })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn kind(&self) -> FragmentKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Fragments are never empty
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn offset(&self) -> Offset {
        Offset::from(self.start)
    }

    pub fn size(&self) -> Size {
        Size::new(self.len() as u64)
    }

    /// Borrow the fragment's bytes from the buffer it was found in
    pub fn slice<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {
        data.get(self.start..self.end)
            .ok_or(RecoveryError::FragmentOutOfBounds {
                start: self.start as u64,
                end: self.end as u64,
                image_size: data.len() as u64,
            })
    }
}

/// Minimum printable run reported as a text fragment
pub const DEFAULT_MIN_TEXT_LEN: usize = 1024;

/// Largest JPEG the footer search will consider (40 MiB)
pub const DEFAULT_MAX_JPEG_LEN: usize = 40 * 1024 * 1024;

/// Command prefixed to every artifact name on the instruction stream
pub const DEFAULT_POST_PROCESS_COMMAND: &str = "gzip";

/// Detector configuration for the scanner
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Minimum printable run length for text fragments
    pub min_text_len: usize,

    /// Footer search window for JPEGs, measured from the header
    pub max_jpeg_len: usize,

    /// Detectors enabled for this scan
    pub kinds: Vec<FragmentKind>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_text_len: DEFAULT_MIN_TEXT_LEN,
            max_jpeg_len: DEFAULT_MAX_JPEG_LEN,
            kinds: FragmentKind::ALL.to_vec(),
        }
    }
}

impl ScanConfig {
    pub fn is_enabled(&self, kind: FragmentKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_text_len == 0 {
            return Err(RecoveryError::Config(
                "minimum text length must be greater than 0".to_string(),
            ));
        }
        if self.max_jpeg_len == 0 {
            return Err(RecoveryError::Config(
                "maximum JPEG size must be greater than 0".to_string(),
            ));
        }
        if self.kinds.is_empty() {
            return Err(RecoveryError::Config(
                "at least one fragment type must be enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where artifacts go and what is announced for each of them
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Directory artifacts are written into
    pub output_dir: PathBuf,

    /// Command written before each artifact name on the instruction stream
    pub command: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            command: DEFAULT_POST_PROCESS_COMMAND.to_string(),
        }
    }
}

impl SinkConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            return Err(RecoveryError::Config(
                "post-processing command cannot be empty".to_string(),
            ));
        }
        if self.output_dir.to_str().is_none() {
            return Err(RecoveryError::Config(format!(
                "output directory {} is not valid UTF-8",
                self.output_dir.display()
            )));
        }
        Ok(())
    }
}

/// Progress update reported by the scan driver
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScanProgress {
    /// Completion in tenths of a percent; only sent when it increases
    Permille(u64),
    /// Cursor reached the end of the buffer
    Complete,
}

impl ScanProgress {
    pub fn percent(&self) -> f64 {
        match self {
            ScanProgress::Permille(p) => *p as f64 / 10.0,
            ScanProgress::Complete => 100.0,
        }
    }
}

/// One decimal place, e.g. `12.3%`
impl std::fmt::Display for ScanProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}%", self.percent())
    }
}

/// Scan statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStats {
    pub bytes_scanned: u64,
    pub jpeg_headers: usize,
    pub jpeg_missing_footers: usize,
    pub jpeg_fragments: usize,
    pub text_fragments: usize,
    pub write_failures: usize,
    pub bytes_carved: u64,
    pub duration_secs: f64,
}

impl ScanStats {
    pub fn fragments_written(&self) -> usize {
        self.jpeg_fragments + self.text_fragments
    }

    pub(crate) fn record_written(&mut self, fragment: &Fragment) {
        match fragment.kind() {
            FragmentKind::Jpeg => self.jpeg_fragments += 1,
            FragmentKind::Text => self.text_fragments += 1,
        }
        self.bytes_carved += fragment.len() as u64;
    }

    pub(crate) fn set_duration(&mut self, elapsed: Duration) {
        self.duration_secs = elapsed.as_secs_f64();
    }
}
