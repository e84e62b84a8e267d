//! The corpus repository: every file the service has seen, keyed by
//! content digest.

use crate::codec::Scheme;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Exact and fuzzy hashes of one entry. Field names on the wire follow
/// the on-disk corpus schema (`tlsh`/`ssdeep` for the two fuzzy slots).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintSet {
    pub sha256: String,
    pub md5: String,
    #[serde(rename = "tlsh", default, skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    #[serde(rename = "ssdeep", default, skip_serializing_if = "Option::is_none")]
    pub ctph: Option<String>,
}

impl FingerprintSet {
    /// Fingerprint for one scheme, if it was computable at ingestion time.
    /// Empty strings (seen in externally produced databases) count as absent.
    pub fn get(&self, scheme: Scheme) -> Option<&str> {
        let slot = match scheme {
            Scheme::Block => self.block.as_deref(),
            Scheme::Ctph => self.ctph.as_deref(),
        };
        slot.filter(|fp| !fp.is_empty())
    }
}

/// One distinct file known to the system. The digest that keys this entry
/// is never recomputed; re-uploads of identical bytes only touch `names`
/// and `last_upload_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusEntry {
    /// Filenames this content has been uploaded under, in upload order.
    #[serde(rename = "name")]
    pub names: Vec<String>,
    pub size: u64,
    pub file_type: String,
    pub first_upload_date: DateTime<Utc>,
    pub last_upload_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub desc: String,
    /// Externally curated classification, absent unless someone sets it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub hashes: FingerprintSet,
}

impl CorpusEntry {
    /// Record a re-upload: append the filename if unseen, refresh
    /// `last_upload_date`. Everything else stays untouched.
    pub fn record_upload(&mut self, filename: &str, at: DateTime<Utc>) {
        if !self.names.iter().any(|n| n == filename) {
            self.names.push(filename.to_string());
        }
        self.last_upload_date = at;
    }
}

/// The full reference set, keyed by sha256 digest. A `BTreeMap` keeps
/// iteration deterministic, which makes index rebuilds (and their
/// last-write-wins collisions) reproducible.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Corpus {
    entries: BTreeMap<String, CorpusEntry>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, digest: &str) -> bool {
        self.entries.contains_key(digest)
    }

    pub fn get(&self, digest: &str) -> Option<&CorpusEntry> {
        self.entries.get(digest)
    }

    pub fn get_mut(&mut self, digest: &str) -> Option<&mut CorpusEntry> {
        self.entries.get_mut(digest)
    }

    pub fn insert(&mut self, digest: String, entry: CorpusEntry) {
        self.entries.insert(digest, entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CorpusEntry)> {
        self.entries.iter()
    }
}
