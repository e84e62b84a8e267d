//! JSON-file persistence for the corpus.

use crate::corpus::Corpus;
use crate::error::StoreError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads and saves the corpus as one JSON document: a mapping from digest
/// to entry. The store never interprets fingerprints.
#[derive(Debug, Clone)]
pub struct CorpusStore {
    path: PathBuf,
}

impl CorpusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty corpus. Malformed JSON is surfaced to
    /// the caller; there is no partial recovery of broken entries.
    pub fn load(&self) -> Result<Corpus, StoreError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "corpus file absent, starting empty");
                return Ok(Corpus::new());
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Serialize to a sibling tempfile and rename into place, so a failed
    /// save never leaves a truncated corpus behind.
    pub fn save(&self, corpus: &Corpus) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, corpus)?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.path).map_err(|err| StoreError::Io(err.error))?;
        Ok(())
    }
}
