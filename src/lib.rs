//! simdex: content-aware similarity detection over a persistent corpus.
//!
//! An upload is classified, reduced to its fingerprintable content, and
//! fingerprinted under two complementary fuzzy-hash schemes: a
//! byte-distribution scheme (`block`, distance-scored) and a
//! content-triggered piecewise scheme (`ctph`, similarity-scored). Both
//! fingerprints are ranked against an in-memory index of everything the
//! service has seen, and the per-scheme rankings merge into one view.
//!
//! Layering, bottom up:
//!
//! - [`content`] / [`extract`]: classify bytes, reduce documents to text
//! - [`codec`]: the two fingerprint schemes, compute and compare
//! - [`corpus`] / [`store`]: the reference set and its JSON persistence
//! - [`index`] / [`matcher`]: fingerprint maps, ranking, and merging
//! - [`engine`]: snapshot lifecycle tying it all together
//! - [`server`] (feature `"server"`): the thin HTTP surface
//!
//! ```no_run
//! use simdex::engine::{Engine, EngineConfig};
//! use simdex::store::CorpusStore;
//!
//! # fn main() -> Result<(), simdex::error::EngineError> {
//! let store = CorpusStore::new("data/corpus.json");
//! let engine = Engine::open(store, EngineConfig::default())?;
//! let upload = b"some file contents to fingerprint".repeat(64);
//! let report = engine.compare(&upload, "sample.bin", false)?;
//! println!("{} candidates", report.similar.len());
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod content;
pub mod corpus;
pub mod digest;
pub mod engine;
pub mod error;
pub mod extract;
pub mod index;
pub mod matcher;
pub mod store;

#[cfg(feature = "server")]
pub mod server;

pub use codec::Scheme;
pub use content::ContentKind;
pub use corpus::{Corpus, CorpusEntry, FingerprintSet};
pub use engine::{CompareReport, Engine, EngineConfig, IngestOutcome, QueryReport};
pub use error::{CodecError, EngineError, ExtractError, StoreError};
pub use index::SimilarityIndex;
pub use matcher::{RankedMatch, Ranking, SimilarFile};
pub use store::CorpusStore;
