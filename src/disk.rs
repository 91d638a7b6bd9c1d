use crate::error::{RecoveryError, Result};
use crate::types::Size;
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Read-only memory-mapped disk image
pub struct DiskImage {
    // Zero-length files cannot be mapped, so they carry no map at all
    mmap: Option<Mmap>,
    size: Size,
    path: PathBuf,
}

impl DiskImage {
    /// Open a disk image file or block device with memory mapping
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let file = File::open(path_ref).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RecoveryError::FileNotFound(path_ref.display().to_string())
            } else {
                RecoveryError::Io(e)
            }
        })?;

        let metadata = file.metadata()?;
        if metadata.is_dir() {
            return Err(RecoveryError::InvalidArgument(format!(
                "{} is a directory",
                path_ref.display()
            )));
        }

        // Block devices report a zero length in their metadata, seeking knows better
        let len = if metadata.is_file() {
            metadata.len()
        } else {
            (&file).seek(SeekFrom::End(0))?
        };
        let map_len = usize::try_from(len).map_err(|_| {
            RecoveryError::Mmap(format!("image of {} bytes does not fit in memory", len))
        })?;

        let mmap = if map_len == 0 {
            None
        } else {
            // Safety: the map is only ever read; callers must not truncate the image while scanning
            let mmap = unsafe {
                MmapOptions::new()
                    .len(map_len)
                    .map(&file)
                    .map_err(|e| RecoveryError::Mmap(format!("Failed to mmap file: {}", e)))?
            };
            Some(mmap)
        };
        let size = Size::new(len);

        Ok(Self {
            mmap,
            size,
            path: path_ref.to_path_buf(),
        })
    }

    /// Get the total size of the disk image
    pub fn size(&self) -> Size {
        self.size
    }

    /// Get the path to the disk image
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The whole image as one immutable buffer
    pub fn data(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }
}

impl std::fmt::Debug for DiskImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskImage")
            .field("path", &self.path)
            .field("size", &self.size)
            .finish()
    }
}
