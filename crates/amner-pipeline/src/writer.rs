//! Result file handling
//!
//! The batch is stored as one pretty-printed JSON array. Every write replaces
//! the whole file through a sibling temp file, so a reader never sees a
//! half-written batch.

use std::fs;
use std::path::{Path, PathBuf};

use amner_core::{AmnerError, DocumentRecord, Result};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::debug;

/// Serialize records as a JSON array indented by four spaces.
///
/// Non-ASCII text is written as is.
pub fn serialize_batch(records: &[DocumentRecord]) -> Result<String> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    records.serialize(&mut serializer)?;

    String::from_utf8(buf).map_err(|e| AmnerError::Output(e.to_string()))
}

/// Owns the output path of a batch
#[derive(Debug, Clone)]
pub struct ResultWriter {
    path: PathBuf,
}

impl ResultWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the output file with `records`
    pub fn write(&self, records: &[DocumentRecord]) -> Result<()> {
        let json = serialize_batch(records)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AmnerError::io(parent, e))?;
        }

        let tmp = self.temp_path();
        fs::write(&tmp, json).map_err(|e| AmnerError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| AmnerError::io(&self.path, e))?;

        debug!(path = %self.path.display(), records = records.len(), "wrote batch");
        Ok(())
    }

    /// Read a previously written batch; a missing or empty file is an empty batch
    pub fn load(&self) -> Result<Vec<DocumentRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content =
            fs::read_to_string(&self.path).map_err(|e| AmnerError::io(&self.path, e))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            AmnerError::Output(format!("{} is not a result file: {e}", self.path.display()))
        })
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "result.json".to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }
}
