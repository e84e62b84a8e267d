//! Fuzzy-hash schemes.
//!
//! Two independent locality-sensitive schemes share one capability set:
//! compute a fingerprint string from content bytes, and score two
//! fingerprints of the same scheme against each other.
//!
//! * [`Scheme::Block`] is a TLSH-style block hash: scores are distances,
//!   0 means identical, unbounded above.
//! * [`Scheme::Ctph`] is an ssdeep-style context-triggered piecewise hash:
//!   scores are similarities 0..=100, and a 0 is unrelated noise rather
//!   than a valid worst-place ranking.
//!
//! Both are implemented in-crate over blake3/hex; there is no binding to
//! the GPL ssdeep library.

mod block;
mod ctph;

pub use block::BLOCK_MIN_INPUT;
pub use ctph::CTPH_MIN_INPUT;

use crate::error::CodecError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction in which a scheme's scores improve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOrder {
    /// Lower is better (distances).
    Ascending,
    /// Higher is better (similarities).
    Descending,
}

/// A fuzzy-hash scheme identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    Block,
    Ctph,
}

impl Scheme {
    pub const ALL: [Scheme; 2] = [Scheme::Block, Scheme::Ctph];

    /// Compute this scheme's fingerprint for the given content.
    pub fn compute(self, content: &[u8]) -> Result<String, CodecError> {
        match self {
            Scheme::Block => block::compute(content),
            Scheme::Ctph => ctph::compute(content),
        }
    }

    /// Score two fingerprints of this scheme against each other.
    pub fn compare(self, a: &str, b: &str) -> Result<u32, CodecError> {
        match self {
            Scheme::Block => block::distance(a, b),
            Scheme::Ctph => ctph::similarity(a, b),
        }
    }

    /// Smallest content length this scheme will fingerprint.
    pub fn min_input(self) -> usize {
        match self {
            Scheme::Block => BLOCK_MIN_INPUT,
            Scheme::Ctph => CTPH_MIN_INPUT,
        }
    }

    pub fn order(self) -> ScoreOrder {
        match self {
            Scheme::Block => ScoreOrder::Ascending,
            Scheme::Ctph => ScoreOrder::Descending,
        }
    }

    /// Whether a score of exactly 0 means "no detected relation" and must
    /// be dropped from rankings instead of placed last.
    pub fn zero_is_noise(self) -> bool {
        matches!(self, Scheme::Ctph)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Block => "block",
            Scheme::Ctph => "ctph",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
