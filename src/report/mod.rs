//! JSON manifest of a carving run.
//!
//! The manifest lists every artifact that was written together with the byte
//! range it came from and a SHA-256 digest of its contents, so a run can be
//! audited after the artifacts have been post-processed.

use chrono::Local;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::error::{RecoveryError, Result};
use crate::recovery::WrittenFragment;
use crate::scanner::ScanOutcome;
use crate::types::{FragmentKind, ScanStats};

/// Compute SHA-256 hash of data
#[inline]
pub fn sha256_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Manifest metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Generation timestamp
    pub timestamp: String,
    pub tool_name: String,
    pub version: String,
    pub image_path: String,
    pub image_size: u64,
    pub output_dir: String,
}

/// One carved artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: u64,
    pub file_name: String,
    pub kind: FragmentKind,
    pub start_offset: u64,
    pub end_offset: u64,
    pub length: u64,
    pub sha256: String,
}

impl ManifestEntry {
    /// Describe `written`; the digest is taken over the source buffer range
    pub fn from_written(data: &[u8], written: &WrittenFragment) -> Result<Self> {
        let bytes = data
            .get(written.start as usize..written.end as usize)
            .ok_or(RecoveryError::FragmentOutOfBounds {
                start: written.start,
                end: written.end,
                image_size: data.len() as u64,
            })?;

        Ok(Self {
            id: written.id,
            file_name: written.file_name.clone(),
            kind: written.kind,
            start_offset: written.start,
            end_offset: written.end,
            length: written.len(),
            sha256: sha256_hash(bytes),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub metadata: ManifestMetadata,
    pub stats: ScanStats,
    pub fragments: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn build(data: &[u8], metadata: ManifestMetadata, outcome: &ScanOutcome) -> Result<Self> {
        let fragments = outcome
            .fragments
            .iter()
            .map(|written| ManifestEntry::from_written(data, written))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            metadata,
            stats: outcome.stats.clone(),
            fragments,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| RecoveryError::Manifest(e.to_string()))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(|e| {
            RecoveryError::Manifest(format!("failed to write {}: {}", path.display(), e))
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        serde_json::from_slice(&data).map_err(|e| RecoveryError::Manifest(e.to_string()))
    }
}

/// Helper function to create metadata from scan parameters
pub fn create_manifest_metadata(image_path: &Path, image_size: u64, output_dir: &Path) -> ManifestMetadata {
    ManifestMetadata {
        timestamp: Local::now().to_rfc3339(),
        tool_name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        image_path: image_path.display().to_string(),
        image_size,
        output_dir: output_dir.display().to_string(),
    }
}
