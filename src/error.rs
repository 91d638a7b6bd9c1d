use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the carver
#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Memory mapping error: {0}")]
    Mmap(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid fragment: start {start} must be below end {end}")]
    InvalidFragment { start: u64, end: u64 },

    #[error("Fragment [{start}, {end}) exceeds image bounds (image size: {image_size})")]
    FragmentOutOfBounds {
        start: u64,
        end: u64,
        image_size: u64,
    },

    #[error("Failed to write artifact '{path}': {source}", path = .path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to emit post-processing instruction: {0}")]
    Instruction(#[source] std::io::Error),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for recovery operations
pub type Result<T> = std::result::Result<T, RecoveryError>;
