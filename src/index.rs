//! The similarity index: per-scheme fingerprint-to-digest maps derived
//! from the corpus.
//!
//! The index is a rebuildable cache, never the source of truth. It is
//! rebuilt wholesale on load and after every corpus mutation; there is no
//! incremental update path. Readers always see a fully built index
//! because publication happens by pointer swap (see [`crate::engine`]).

use crate::codec::Scheme;
use crate::corpus::Corpus;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct SimilarityIndex {
    block: BTreeMap<String, String>,
    ctph: BTreeMap<String, String>,
}

impl SimilarityIndex {
    /// Build from scratch. When two entries share a fingerprint under one
    /// scheme, the later corpus entry wins the map slot; ranking iterates
    /// all pairs and never depends on this mapping being injective.
    pub fn build(corpus: &Corpus) -> Self {
        let mut index = Self::default();
        for (digest, entry) in corpus.iter() {
            for scheme in Scheme::ALL {
                if let Some(fp) = entry.hashes.get(scheme) {
                    index.map_mut(scheme).insert(fp.to_string(), digest.clone());
                }
            }
        }
        index
    }

    /// The fingerprint → digest mapping for one scheme.
    pub fn scheme_map(&self, scheme: Scheme) -> &BTreeMap<String, String> {
        match scheme {
            Scheme::Block => &self.block,
            Scheme::Ctph => &self.ctph,
        }
    }

    pub fn len(&self, scheme: Scheme) -> usize {
        self.scheme_map(scheme).len()
    }

    pub fn is_empty(&self) -> bool {
        self.block.is_empty() && self.ctph.is_empty()
    }

    fn map_mut(&mut self, scheme: Scheme) -> &mut BTreeMap<String, String> {
        match scheme {
            Scheme::Block => &mut self.block,
            Scheme::Ctph => &mut self.ctph,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{CorpusEntry, FingerprintSet};
    use chrono::Utc;

    fn entry(name: &str, block: Option<&str>, ctph: Option<&str>) -> CorpusEntry {
        let now = Utc::now();
        CorpusEntry {
            names: vec![name.to_string()],
            size: 1,
            file_type: "application/octet-stream".to_string(),
            first_upload_date: now,
            last_upload_date: now,
            desc: String::new(),
            family: None,
            tags: Vec::new(),
            hashes: FingerprintSet {
                sha256: name.to_string(),
                md5: String::new(),
                block: block.map(str::to_string),
                ctph: ctph.map(str::to_string),
            },
        }
    }

    #[test]
    fn build_indexes_only_present_fingerprints() {
        let mut corpus = Corpus::new();
        corpus.insert("d1".into(), entry("a", Some("B1aa"), Some("64:deadbeef")));
        corpus.insert("d2".into(), entry("b", Some("B1bb"), None));

        let index = SimilarityIndex::build(&corpus);
        assert_eq!(index.len(Scheme::Block), 2);
        assert_eq!(index.len(Scheme::Ctph), 1);
        assert_eq!(index.scheme_map(Scheme::Block).get("B1bb"), Some(&"d2".to_string()));
    }

    #[test]
    fn fingerprint_collision_keeps_last_entry_in_corpus_order() {
        let mut corpus = Corpus::new();
        corpus.insert("d1".into(), entry("a", Some("B1same"), None));
        corpus.insert("d2".into(), entry("b", Some("B1same"), None));

        let index = SimilarityIndex::build(&corpus);
        assert_eq!(index.len(Scheme::Block), 1);
        // BTreeMap corpus order means d2 is visited last and wins
        assert_eq!(index.scheme_map(Scheme::Block).get("B1same"), Some(&"d2".to_string()));
    }

    #[test]
    fn rebuild_is_deterministic() {
        let mut corpus = Corpus::new();
        corpus.insert("d1".into(), entry("a", Some("B1aa"), Some("64:deadbeef")));
        corpus.insert("d2".into(), entry("b", Some("B1bb"), Some("64:cafebabe")));

        let first = SimilarityIndex::build(&corpus);
        let second = SimilarityIndex::build(&corpus);
        for scheme in Scheme::ALL {
            let keys_first: Vec<_> = first.scheme_map(scheme).keys().collect();
            let keys_second: Vec<_> = second.scheme_map(scheme).keys().collect();
            assert_eq!(keys_first, keys_second);
        }
    }

    #[test]
    fn empty_corpus_builds_empty_index() {
        let index = SimilarityIndex::build(&Corpus::new());
        assert!(index.is_empty());
    }
}
