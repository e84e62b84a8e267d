//! The engine: owned, injectable context holding the corpus and its
//! similarity index.
//!
//! Readers take a consistent snapshot (one `Arc` clone) and never block
//! writers; writers serialize among themselves, rebuild corpus and index
//! fully off to the side, persist, and only then publish by pointer swap.
//! A ranking call therefore always sees one coherent corpus/index pair,
//! even while an ingest or reload is in flight.

use crate::codec::Scheme;
use crate::content::classify;
use crate::corpus::{Corpus, CorpusEntry, FingerprintSet};
use crate::digest::{md5_hex, sha256_hex};
use crate::error::{CodecError, EngineError};
use crate::extract::extract;
use crate::index::SimilarityIndex;
use crate::matcher::{merge, rank, RankedMatch, Ranking, SimilarFile};
use crate::store::CorpusStore;
use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{info, info_span, warn};

/// Reference top-K size.
pub const DEFAULT_TOP_MATCHES: usize = 10;
/// Reference upload ceiling: 5 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_upload_bytes: usize,
    pub top_matches: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            top_matches: DEFAULT_TOP_MATCHES,
        }
    }
}

/// A consistent corpus/index pair, published atomically.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub corpus: Corpus,
    pub index: SimilarityIndex,
}

/// Corpus and index sizes, as reported by health checks.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EngineStats {
    pub entries: usize,
    pub block_index: usize,
    pub ctph_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// New content: a corpus entry was created and persisted.
    Added { digest: String },
    /// Known content: alias list and last-upload timestamp refreshed.
    AlreadyKnown { digest: String },
}

impl IngestOutcome {
    pub fn digest(&self) -> &str {
        match self {
            IngestOutcome::Added { digest } | IngestOutcome::AlreadyKnown { digest } => digest,
        }
    }
}

/// Report for a stored digest: its metadata plus the merged two-scheme
/// similarity view over the current snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub sha256: String,
    #[serde(flatten)]
    pub entry: CorpusEntry,
    pub similar: Vec<SimilarFile>,
}

/// Per-scheme half of a comparison result. The ctph half can be
/// unavailable while the block half ranked fine; the block half cannot
/// (its failure aborts the whole pipeline).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SchemeOutcome {
    Ranked(Ranking),
    Unavailable { error: String },
}

/// Full pipeline result for one uploaded file.
#[derive(Debug, Clone, Serialize)]
pub struct CompareReport {
    pub filename: String,
    pub sha256: String,
    pub md5: String,
    pub size: u64,
    pub file_type: String,
    /// Length of the extracted content that was fingerprinted (differs
    /// from `size` for document formats).
    pub content_size: u64,
    pub already_known: bool,
    pub saved: bool,
    pub block: Ranking,
    pub ctph: SchemeOutcome,
    pub similar: Vec<SimilarFile>,
}

pub struct Engine {
    snapshot: RwLock<Arc<Snapshot>>,
    /// Serializes ingest/reload; readers never take it.
    write_gate: Mutex<()>,
    store: CorpusStore,
    config: EngineConfig,
}

impl Engine {
    /// Load the corpus from the store and build the index. Malformed
    /// persisted data fails the open; it is never partially recovered.
    pub fn open(store: CorpusStore, config: EngineConfig) -> Result<Self, EngineError> {
        let corpus = store.load()?;
        let index = SimilarityIndex::build(&corpus);
        info!(
            entries = corpus.len(),
            block_index = index.len(Scheme::Block),
            ctph_index = index.len(Scheme::Ctph),
            path = %store.path().display(),
            "corpus loaded"
        );
        Ok(Self {
            snapshot: RwLock::new(Arc::new(Snapshot { corpus, index })),
            write_gate: Mutex::new(()),
            store,
            config,
        })
    }

    /// The current corpus/index snapshot. Holding the returned `Arc`
    /// pins one consistent view for as long as the caller needs it.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn stats(&self) -> EngineStats {
        let snap = self.snapshot();
        EngineStats {
            entries: snap.corpus.len(),
            block_index: snap.index.len(Scheme::Block),
            ctph_index: snap.index.len(Scheme::Ctph),
        }
    }

    /// Re-read the store and swap the snapshot. In-flight readers keep
    /// their old snapshot until they finish.
    pub fn reload(&self) -> Result<EngineStats, EngineError> {
        let _gate = self.write_gate.lock().unwrap_or_else(|p| p.into_inner());
        let corpus = self.store.load()?;
        let index = SimilarityIndex::build(&corpus);
        info!(entries = corpus.len(), "corpus reloaded from disk");
        self.publish(Snapshot { corpus, index });
        Ok(self.stats())
    }

    /// Add an upload to the corpus, or refresh the existing entry when
    /// the content is already known. The published snapshot is only
    /// replaced after a successful save, so a persistence failure leaves
    /// both memory and disk at the previous state.
    pub fn ingest(
        &self,
        bytes: &[u8],
        filename: &str,
        desc: Option<&str>,
    ) -> Result<IngestOutcome, EngineError> {
        let span = info_span!("ingest", filename, size = bytes.len());
        let _guard = span.enter();

        self.check_size(bytes)?;
        let digest = sha256_hex(bytes);

        let _gate = self.write_gate.lock().unwrap_or_else(|p| p.into_inner());
        let mut corpus = self.snapshot().corpus.clone();

        if let Some(entry) = corpus.get_mut(&digest) {
            entry.record_upload(filename, Utc::now());
            self.store.save(&corpus)?;
            let index = SimilarityIndex::build(&corpus);
            self.publish(Snapshot { corpus, index });
            info!(%digest, "known content, alias refreshed");
            return Ok(IngestOutcome::AlreadyKnown { digest });
        }

        let entry = self.build_entry(bytes, filename, desc, &digest)?;
        corpus.insert(digest.clone(), entry);
        self.store.save(&corpus)?;
        let index = SimilarityIndex::build(&corpus);
        self.publish(Snapshot { corpus, index });
        info!(%digest, "new corpus entry persisted");
        Ok(IngestOutcome::Added { digest })
    }

    /// Look up a known digest and rank it against the rest of the corpus
    /// under both schemes. Self-matches are intentionally included.
    pub fn query(&self, digest: &str) -> Result<QueryReport, EngineError> {
        let snap = self.snapshot();
        let entry = snap
            .corpus
            .get(digest)
            .ok_or_else(|| EngineError::UnknownDigest(digest.to_string()))?;

        let block_matches = self.scheme_matches(&snap, entry, Scheme::Block);
        let ctph_matches = self.scheme_matches(&snap, entry, Scheme::Ctph);
        let similar = merge(&block_matches, &ctph_matches);

        Ok(QueryReport {
            sha256: digest.to_string(),
            entry: entry.clone(),
            similar,
        })
    }

    /// Run the full comparison pipeline on an upload: classify, extract,
    /// fingerprint, rank both schemes, merge. The block scheme is the
    /// mandatory primary: its failure aborts. A ctph failure degrades to
    /// a partial result. With `persist`, the upload is ingested only
    /// after the pipeline has succeeded.
    pub fn compare(
        &self,
        bytes: &[u8],
        filename: &str,
        persist: bool,
    ) -> Result<CompareReport, EngineError> {
        let span = info_span!("compare", filename, size = bytes.len(), persist);
        let _guard = span.enter();

        self.check_size(bytes)?;
        let kind = classify(bytes);
        let content = extract(bytes, kind)?;

        let block_fp = Scheme::Block.compute(&content)?;
        let snap = self.snapshot();
        let block = rank(
            Scheme::Block,
            &block_fp,
            &snap.index,
            &snap.corpus,
            self.config.top_matches,
        );

        let (ctph, ctph_matches) = match Scheme::Ctph.compute(&content) {
            Ok(fp) => {
                let ranking = rank(
                    Scheme::Ctph,
                    &fp,
                    &snap.index,
                    &snap.corpus,
                    self.config.top_matches,
                );
                let matches = ranking.matches.clone();
                (SchemeOutcome::Ranked(ranking), matches)
            }
            Err(err) => {
                warn!(error = %err, "ctph ranking unavailable for this upload");
                (SchemeOutcome::Unavailable { error: err.to_string() }, Vec::new())
            }
        };

        let similar = merge(&block.matches, &ctph_matches);
        let digest = sha256_hex(bytes);
        let already_known = snap.corpus.contains(&digest);

        let saved = if persist {
            matches!(
                self.ingest(bytes, filename, None)?,
                IngestOutcome::Added { .. }
            )
        } else {
            false
        };

        Ok(CompareReport {
            filename: filename.to_string(),
            sha256: digest,
            md5: md5_hex(bytes),
            size: bytes.len() as u64,
            file_type: kind.media_type().to_string(),
            content_size: content.len() as u64,
            already_known,
            saved,
            block,
            ctph,
            similar,
        })
    }

    fn scheme_matches(
        &self,
        snap: &Snapshot,
        entry: &CorpusEntry,
        scheme: Scheme,
    ) -> Vec<RankedMatch> {
        match entry.hashes.get(scheme) {
            Some(fp) => {
                rank(scheme, fp, &snap.index, &snap.corpus, self.config.top_matches).matches
            }
            None => Vec::new(),
        }
    }

    fn build_entry(
        &self,
        bytes: &[u8],
        filename: &str,
        desc: Option<&str>,
        digest: &str,
    ) -> Result<CorpusEntry, EngineError> {
        let kind = classify(bytes);
        let content = extract(bytes, kind)?;
        let (block, ctph) = fuzzy_fingerprints(&content)?;
        let now = Utc::now();
        Ok(CorpusEntry {
            names: vec![filename.to_string()],
            size: bytes.len() as u64,
            file_type: kind.media_type().to_string(),
            first_upload_date: now,
            last_upload_date: now,
            desc: desc.unwrap_or_default().to_string(),
            family: None,
            tags: Vec::new(),
            hashes: FingerprintSet {
                sha256: digest.to_string(),
                md5: md5_hex(bytes),
                block: Some(block),
                ctph,
            },
        })
    }

    fn check_size(&self, bytes: &[u8]) -> Result<(), EngineError> {
        if bytes.len() > self.config.max_upload_bytes {
            return Err(EngineError::TooLarge {
                size: bytes.len(),
                max: self.config.max_upload_bytes,
            });
        }
        Ok(())
    }

    fn publish(&self, snapshot: Snapshot) {
        let mut guard = self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(snapshot);
    }
}

/// The block fingerprint is mandatory; a ctph floor miss just leaves that
/// slot empty on the entry.
fn fuzzy_fingerprints(content: &[u8]) -> Result<(String, Option<String>), CodecError> {
    let block = Scheme::Block.compute(content)?;
    let ctph = match Scheme::Ctph.compute(content) {
        Ok(fp) => Some(fp),
        Err(err) => {
            warn!(error = %err, "content not eligible for ctph fingerprinting");
            None
        }
    };
    Ok((block, ctph))
}
