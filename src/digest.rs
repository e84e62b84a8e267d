//! Exact-match content digests.

use md5::Md5;
use sha2::{Digest, Sha256};

/// Hex SHA-256 of the raw upload. The corpus primary key: byte-identical
/// content always maps to the same entry.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Hex MD5 of the raw upload, stored for cross-referencing with external
/// tooling. Never used for ranking.
pub fn md5_hex(bytes: &[u8]) -> String {
    hex::encode(Md5::digest(bytes))
}
