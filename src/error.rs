//! Error types for the extraction, fingerprinting, and persistence layers.

use crate::codec::Scheme;
use thiserror::Error;

/// Failures while turning raw upload bytes into fingerprintable content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("content too small to fingerprint: {got} bytes, need at least {min}")]
    TooSmall { got: usize, min: usize },

    #[error("no extractable text ({scanned} {unit} scanned)")]
    NoExtractableText { scanned: usize, unit: &'static str },

    #[error("document is corrupt, encrypted, or unsupported: {0}")]
    CorruptOrProtected(String),
}

/// Failures while computing or comparing fuzzy fingerprints.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("{scheme} fingerprint needs at least {min} bytes of content, got {got}")]
    InputTooSmall {
        scheme: Scheme,
        min: usize,
        got: usize,
    },

    #[error("content too repetitive to fingerprint: {populated} buckets populated, {needed} required")]
    InsufficientEntropy { populated: usize, needed: usize },

    #[error("malformed {scheme} fingerprint: {detail}")]
    MalformedFingerprint { scheme: Scheme, detail: String },
}

/// Failures of the on-disk corpus store. Malformed data is surfaced to the
/// caller, never partially recovered.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("corpus database i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("corpus database is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Failures of engine-level operations, as reported to the service layer.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("file exceeds the upload limit: {size} bytes, max {max}")]
    TooLarge { size: usize, max: usize },

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no file with digest {0} in the corpus")]
    UnknownDigest(String),
}
