use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{RecoveryError, Result};
use crate::types::{Fragment, FragmentKind, SinkConfig, DEFAULT_POST_PROCESS_COMMAND};

/// Consumes fragments found by the scanner
pub trait FragmentSink {
    /// Persist `fragment`, whose bytes live in `data`
    fn accept(&mut self, data: &[u8], fragment: &Fragment) -> Result<WrittenFragment>;
}

/// An artifact that made it to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenFragment {
    pub id: u64,
    pub file_name: String,
    pub path: PathBuf,
    pub kind: FragmentKind,
    pub start: u64,
    pub end: u64,
}

impl WrittenFragment {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// `<tag>-fragment-<id>.<tag>`
pub fn artifact_name(kind: FragmentKind, id: u64) -> String {
    format!("{tag}-fragment-{id}.{tag}", tag = kind.tag(), id = id)
}

/// Quote `word` for a POSIX shell when it contains anything unusual
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"-_./+=:@%,".contains(&b));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Writes every fragment to its own file in a directory and announces it on an
/// instruction stream as `<command> <artifact>`.
///
/// The artifact is written and closed before its line is flushed, so a shell
/// reading the stream concurrently never sees a name whose file is incomplete.
pub struct DirectorySink<W: Write> {
    output_dir: PathBuf,
    command: String,
    instructions: W,
    last_id: u64,
}

impl<W: Write> DirectorySink<W> {
    /// Sink for the directory and command named in `config`
    pub fn from_config(config: &SinkConfig, instructions: W) -> Self {
        Self::new(&config.output_dir, instructions).with_command(config.command.clone())
    }

    pub fn new(output_dir: impl Into<PathBuf>, instructions: W) -> Self {
        Self {
            output_dir: output_dir.into(),
            command: DEFAULT_POST_PROCESS_COMMAND.to_string(),
            instructions,
            last_id: 0,
        }
    }

    /// Replace the post-processing command (default `gzip`)
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Last identifier handed out, 0 before the first fragment
    pub fn last_id(&self) -> u64 {
        self.last_id
    }

    pub fn into_inner(self) -> W {
        self.instructions
    }

    fn artifact_path(&self, file_name: &str) -> PathBuf {
        if self.output_dir.as_os_str().is_empty() || self.output_dir == Path::new(".") {
            PathBuf::from(file_name)
        } else {
            self.output_dir.join(file_name)
        }
    }

    // Never clobbers: identifiers whose file already exists are skipped
    fn create_artifact(&mut self, kind: FragmentKind) -> Result<(u64, String, PathBuf, File)> {
        loop {
            self.last_id += 1;
            let file_name = artifact_name(kind, self.last_id);
            let path = self.artifact_path(&file_name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((self.last_id, file_name, path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("{} already exists, skipping identifier", path.display());
                }
                Err(source) => return Err(RecoveryError::ArtifactWrite { path, source }),
            }
        }
    }
}

/// Create `dir` if needed and make sure artifacts can be created inside it
pub fn ensure_writable_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| {
        RecoveryError::InvalidArgument(format!(
            "cannot create output directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    // The scratch file is unlinked when dropped
    tempfile::tempfile_in(dir).map_err(|e| {
        RecoveryError::InvalidArgument(format!(
            "output directory {} is not writable: {}",
            dir.display(),
            e
        ))
    })?;
    Ok(())
}

fn write_artifact(file: File, bytes: &[u8]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes)?;
    writer.flush()
}

impl<W: Write> FragmentSink for DirectorySink<W> {
    fn accept(&mut self, data: &[u8], fragment: &Fragment) -> Result<WrittenFragment> {
        let bytes = fragment.slice(data)?;
        let (id, file_name, path, file) = self.create_artifact(fragment.kind())?;

        if let Err(source) = write_artifact(file, bytes) {
            let _ = fs::remove_file(&path);
            return Err(RecoveryError::ArtifactWrite { path, source });
        }

        let target = shell_quote(&path.to_string_lossy());
        if let Err(source) = writeln!(self.instructions, "{} {}", self.command, target)
            .and_then(|_| self.instructions.flush())
        {
            // Unannounced artifacts are not kept
            let _ = fs::remove_file(&path);
            return Err(RecoveryError::Instruction(source));
        }

        info!("Wrote {} ({} bytes)", file_name, bytes.len());

        Ok(WrittenFragment {
            id,
            file_name,
            path,
            kind: fragment.kind(),
            start: fragment.start() as u64,
            end: fragment.end() as u64,
        })
    }
}
