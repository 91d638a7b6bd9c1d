use clap::Parser;
use std::path::PathBuf;

use crate::types::{
    FragmentKind, ScanConfig, SinkConfig, DEFAULT_MAX_JPEG_LEN, DEFAULT_MIN_TEXT_LEN,
};

/// Recover JPEG images and text files from a raw disk image
///
/// Artifacts are written to the output directory. One post-processing command
/// per artifact is printed on stdout; pipe it to a shell to run it alongside
/// the scan. Diagnostics and progress go to stderr.
#[derive(Parser, Debug, Clone)]
#[command(name = "rescue")]
#[command(version)]
#[command(about = "Recover files from a raw disk image by signature", long_about = None)]
pub struct Args {
    /// Disk image file or block device to scan
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    /// Output directory for recovered fragments
    #[arg(short = 'o', long = "output", default_value = ".", env = "RESCUE_OUTPUT")]
    pub output: PathBuf,

    /// Minimum printable run, in bytes, kept as a text fragment
    #[arg(long = "min-text-len", default_value_t = DEFAULT_MIN_TEXT_LEN)]
    pub min_text_len: usize,

    /// Largest JPEG to look for, in MiB
    #[arg(long = "max-jpeg-size", default_value_t = (DEFAULT_MAX_JPEG_LEN / (1024 * 1024)) as u64)]
    pub max_jpeg_size: u64,

    /// Command printed before each artifact name
    #[arg(long = "command", default_value = "gzip", env = "RESCUE_COMMAND")]
    pub command: String,

    /// Only carve these fragment types (comma-separated: jpg,txt)
    #[arg(long = "only", value_delimiter = ',')]
    pub only: Vec<String>,

    /// Write a JSON manifest of recovered fragments to this path
    #[arg(long = "manifest", value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Disable the progress percentage on stderr
    #[arg(long = "no-progress")]
    pub no_progress: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Validate the arguments
    pub fn validate(&self) -> Result<(), String> {
        if self.image.as_os_str().is_empty() {
            return Err("Image path cannot be empty".to_string());
        }

        // Artifact paths are echoed as text on the instruction stream
        if self.output.to_str().is_none() {
            return Err(format!(
                "output directory {} is not valid UTF-8",
                self.output.display()
            ));
        }

        if self.min_text_len == 0 {
            return Err("min-text-len must be greater than 0".to_string());
        }

        if self.max_jpeg_size == 0 {
            return Err("max-jpeg-size must be greater than 0".to_string());
        }

        if self.max_jpeg_bytes().is_none() {
            return Err(format!(
                "max-jpeg-size ({} MiB) is too large for this platform",
                self.max_jpeg_size
            ));
        }

        if self.command.trim().is_empty() {
            return Err("command cannot be empty".to_string());
        }

        self.kinds()?;

        Ok(())
    }

    /// Get max JPEG size in bytes
    pub fn max_jpeg_bytes(&self) -> Option<usize> {
        self.max_jpeg_size
            .checked_mul(1024 * 1024)
            .and_then(|bytes| usize::try_from(bytes).ok())
    }

    /// Fragment types selected with `--only`, every type when absent
    pub fn kinds(&self) -> Result<Vec<FragmentKind>, String> {
        if self.only.is_empty() {
            return Ok(FragmentKind::ALL.to_vec());
        }

        let mut kinds = Vec::new();
        for tag in &self.only {
            let kind = FragmentKind::from_tag(tag)
                .ok_or_else(|| format!("unknown fragment type '{}' (expected jpg or txt)", tag))?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }

    pub fn scan_config(&self) -> Result<ScanConfig, String> {
        Ok(ScanConfig {
            min_text_len: self.min_text_len,
            max_jpeg_len: self.max_jpeg_bytes().unwrap_or(DEFAULT_MAX_JPEG_LEN),
            kinds: self.kinds()?,
        })
    }

    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            output_dir: self.output.clone(),
            command: self.command.clone(),
        }
    }
}
