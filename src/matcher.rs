//! Ranking a probe fingerprint against the index, and merging the two
//! schemes' rankings into one view.

use crate::codec::{Scheme, ScoreOrder};
use crate::corpus::Corpus;
use crate::index::SimilarityIndex;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

/// One scored corpus entry in a single-scheme ranking.
#[derive(Debug, Clone, Serialize)]
pub struct RankedMatch {
    pub digest: String,
    pub names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    pub file_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub score: u32,
}

/// Outcome of ranking one probe against one scheme's index.
#[derive(Debug, Clone, Serialize)]
pub struct Ranking {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best: Option<RankedMatch>,
    pub matches: Vec<RankedMatch>,
    /// Records considered: every compared pair for a distance scheme,
    /// only nonzero pairs for a similarity scheme with a zero-noise
    /// filter. The asymmetry is part of the contract.
    pub compared: usize,
}

/// Linear scan of one scheme's index against a probe fingerprint.
///
/// Entries whose stored fingerprint cannot be compared are skipped with a
/// warning and never abort the ranking. Ties on the best score keep the
/// first entry seen in index order.
pub fn rank(
    scheme: Scheme,
    probe: &str,
    index: &SimilarityIndex,
    corpus: &Corpus,
    top_n: usize,
) -> Ranking {
    let mut matches: Vec<RankedMatch> = Vec::new();
    let mut best: Option<RankedMatch> = None;

    for (fingerprint, digest) in index.scheme_map(scheme) {
        let score = match scheme.compare(probe, fingerprint) {
            Ok(score) => score,
            Err(err) => {
                warn!(%scheme, %digest, error = %err, "skipping uncomparable fingerprint");
                continue;
            }
        };
        if scheme.zero_is_noise() && score == 0 {
            continue;
        }
        // the index is derived from this corpus, so a miss here means a
        // stale snapshot was mixed in; skip rather than abort
        let Some(entry) = corpus.get(digest) else {
            warn!(%scheme, %digest, "index entry missing from corpus");
            continue;
        };

        let record = RankedMatch {
            digest: digest.clone(),
            names: entry.names.clone(),
            family: entry.family.clone(),
            file_type: entry.file_type.clone(),
            tags: entry.tags.clone(),
            score,
        };
        let improves = match (&best, scheme.order()) {
            (None, _) => true,
            (Some(b), ScoreOrder::Ascending) => record.score < b.score,
            (Some(b), ScoreOrder::Descending) => record.score > b.score,
        };
        if improves {
            best = Some(record.clone());
        }
        matches.push(record);
    }

    let compared = matches.len();
    match scheme.order() {
        ScoreOrder::Ascending => matches.sort_by_key(|m| m.score),
        ScoreOrder::Descending => matches.sort_by_key(|m| std::cmp::Reverse(m.score)),
    }
    matches.truncate(top_n);

    Ranking {
        best,
        matches,
        compared,
    }
}

/// One entry in the merged two-scheme view. Block distances are rendered
/// as `max(0, 100 - distance)` so both columns read as percentages; the
/// raw distance stays available in the per-scheme ranking.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarFile {
    pub digest: String,
    pub names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    pub file_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub block_score: u32,
    pub ctph_score: u32,
}

/// Union of the two rankings, keyed by digest. An entry found by only one
/// scheme keeps score 0 for the other; nothing found by either scheme is
/// dropped. Order follows the block ranking first, then ctph-only entries.
pub fn merge(block: &[RankedMatch], ctph: &[RankedMatch]) -> Vec<SimilarFile> {
    let mut merged: Vec<SimilarFile> = Vec::with_capacity(block.len() + ctph.len());
    let mut by_digest: HashMap<&str, usize> = HashMap::new();

    for m in block {
        by_digest.insert(m.digest.as_str(), merged.len());
        merged.push(SimilarFile {
            digest: m.digest.clone(),
            names: m.names.clone(),
            family: m.family.clone(),
            file_type: m.file_type.clone(),
            tags: m.tags.clone(),
            block_score: 100u32.saturating_sub(m.score),
            ctph_score: 0,
        });
    }
    for m in ctph {
        if let Some(&slot) = by_digest.get(m.digest.as_str()) {
            merged[slot].ctph_score = m.score;
        } else {
            merged.push(SimilarFile {
                digest: m.digest.clone(),
                names: m.names.clone(),
                family: m.family.clone(),
                file_type: m.file_type.clone(),
                tags: m.tags.clone(),
                block_score: 0,
                ctph_score: m.score,
            });
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{CorpusEntry, FingerprintSet};
    use chrono::Utc;

    fn text(seed: usize, paragraphs: usize) -> Vec<u8> {
        let mut out = String::new();
        for i in 0..paragraphs {
            out.push_str(&format!(
                "Entry {seed} line {i}: the quick brown fox jumps over the \
                 lazy dog while {i} ships sail past the harbour light.\n"
            ));
        }
        out.into_bytes()
    }

    fn entry_for(name: &str, content: &[u8]) -> CorpusEntry {
        let now = Utc::now();
        CorpusEntry {
            names: vec![name.to_string()],
            size: content.len() as u64,
            file_type: "application/octet-stream".to_string(),
            first_upload_date: now,
            last_upload_date: now,
            desc: String::new(),
            family: None,
            tags: Vec::new(),
            hashes: FingerprintSet {
                sha256: name.to_string(),
                md5: String::new(),
                block: Scheme::Block.compute(content).ok(),
                ctph: Scheme::Ctph.compute(content).ok(),
            },
        }
    }

    fn ranked(digest: &str, score: u32) -> RankedMatch {
        RankedMatch {
            digest: digest.to_string(),
            names: vec![format!("{digest}.bin")],
            family: None,
            file_type: "application/octet-stream".to_string(),
            tags: Vec::new(),
            score,
        }
    }

    #[test]
    fn ranking_is_sorted_and_truncated() {
        let contents: Vec<Vec<u8>> = (0..4).map(|i| text(i, 20 + 7 * i)).collect();
        let mut corpus = Corpus::new();
        for (i, content) in contents.iter().enumerate() {
            corpus.insert(format!("d{i}"), entry_for(&format!("d{i}"), content));
        }
        let index = SimilarityIndex::build(&corpus);

        let probe = Scheme::Block.compute(&contents[0]).unwrap();
        let ranking = rank(Scheme::Block, &probe, &index, &corpus, 2);

        assert_eq!(ranking.compared, 4);
        assert_eq!(ranking.matches.len(), 2);
        assert!(ranking.matches[0].score <= ranking.matches[1].score);
        let best = ranking.best.unwrap();
        assert_eq!(best.digest, "d0");
        assert_eq!(best.score, 0);
    }

    #[test]
    fn ctph_ranking_drops_zero_scores() {
        // d0/d1 are near-identical large texts, d2 is unrelated noise
        let base = text(0, 100);
        let mut edited = base.clone();
        let patch = b"A COMPLETELY DIFFERENT SENTENCE SITS HERE NOW";
        let mid = edited.len() / 2;
        edited[mid..mid + patch.len()].copy_from_slice(patch);
        let mut seed = 42u64;
        let unrelated: Vec<u8> = (0..base.len())
            .map(|_| {
                seed = seed
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (seed >> 33) as u8
            })
            .collect();

        let mut corpus = Corpus::new();
        corpus.insert("d0".into(), entry_for("d0", &base));
        corpus.insert("d1".into(), entry_for("d1", &edited));
        corpus.insert("d2".into(), entry_for("d2", &unrelated));
        let index = SimilarityIndex::build(&corpus);

        let probe = Scheme::Ctph.compute(&base).unwrap();
        let ranking = rank(Scheme::Ctph, &probe, &index, &corpus, 10);

        assert_eq!(ranking.compared, 2, "noise entry must be filtered, not ranked last");
        assert!(ranking.matches.iter().all(|m| m.score > 0));
        assert!(ranking.matches.iter().all(|m| m.digest != "d2"));
        assert_eq!(ranking.best.unwrap().digest, "d0");
    }

    #[test]
    fn empty_index_yields_empty_ranking() {
        let corpus = Corpus::new();
        let index = SimilarityIndex::build(&corpus);
        let probe = Scheme::Block.compute(&text(0, 20)).unwrap();
        let ranking = rank(Scheme::Block, &probe, &index, &corpus, 10);
        assert!(ranking.best.is_none());
        assert!(ranking.matches.is_empty());
        assert_eq!(ranking.compared, 0);
    }

    #[test]
    fn merge_is_a_union_keyed_by_digest() {
        let block = vec![ranked("d1", 0), ranked("d2", 30)];
        let ctph = vec![ranked("d1", 100), ranked("d3", 55)];

        let merged = merge(&block, &ctph);
        assert_eq!(merged.len(), 3);

        let d1 = merged.iter().find(|m| m.digest == "d1").unwrap();
        assert_eq!((d1.block_score, d1.ctph_score), (100, 100));
        let d2 = merged.iter().find(|m| m.digest == "d2").unwrap();
        assert_eq!((d2.block_score, d2.ctph_score), (70, 0));
        let d3 = merged.iter().find(|m| m.digest == "d3").unwrap();
        assert_eq!((d3.block_score, d3.ctph_score), (0, 55));
    }

    #[test]
    fn merge_clamps_large_distances_to_zero() {
        let block = vec![ranked("d1", 250)];
        let merged = merge(&block, &[]);
        assert_eq!(merged[0].block_score, 0);
    }
}
