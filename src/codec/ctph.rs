//! Context-triggered piecewise hash (Scheme B).
//!
//! Content is cut into pieces wherever a rolling hash over the last seven
//! bytes hits a trigger value; each piece contributes a short blake3-XOF
//! hash to the fingerprint. The trigger modulus scales with input length
//! so a fingerprint holds roughly 64 pieces regardless of file size.
//! Because piece boundaries are content-defined, a local edit disturbs
//! only the pieces around it and the rest re-synchronize, which is what
//! makes the Jaccard comparison meaningful.

use super::Scheme;
use crate::error::CodecError;
use std::collections::HashSet;

/// Hard minimum content length; below this, piece counts are too low for
/// the similarity score to mean anything.
pub const CTPH_MIN_INPUT: usize = 4096;

const WINDOW: usize = 7;
const PIECE_HASH_BYTES: usize = 4;
const TARGET_PIECES: u64 = 64;
const MIN_TRIGGER: u64 = 64;

struct RollingHash {
    window: [u8; WINDOW],
    filled: usize,
    pos: usize,
    hash: u32,
}

impl RollingHash {
    fn new() -> Self {
        Self {
            window: [0; WINDOW],
            filled: 0,
            pos: 0,
            hash: 0,
        }
    }

    fn update(&mut self, byte: u8) {
        if self.filled == WINDOW {
            let old = self.window[self.pos];
            self.hash = self.hash.wrapping_sub(u32::from(old));
        } else {
            self.filled += 1;
        }
        self.window[self.pos] = byte;
        self.pos = (self.pos + 1) % WINDOW;
        self.hash = self.hash.wrapping_add(u32::from(byte)).rotate_left(1);
    }
}

pub(super) fn compute(content: &[u8]) -> Result<String, CodecError> {
    if content.len() < CTPH_MIN_INPUT {
        return Err(CodecError::InputTooSmall {
            scheme: Scheme::Ctph,
            min: CTPH_MIN_INPUT,
            got: content.len(),
        });
    }

    let modulus = trigger_modulus(content.len());
    let mut rolling = RollingHash::new();
    let mut pieces: Vec<String> = Vec::new();
    let mut start = 0usize;

    for (i, &byte) in content.iter().enumerate() {
        rolling.update(byte);
        let piece_len = (i + 1 - start) as u64;
        // hard cap keeps degenerate inputs from producing one giant piece
        if u64::from(rolling.hash) % modulus == modulus - 1 || piece_len >= modulus * 8 {
            pieces.push(hash_piece(&content[start..=i]));
            start = i + 1;
        }
    }
    if start < content.len() {
        pieces.push(hash_piece(&content[start..]));
    }

    Ok(format!("{modulus}:{}", pieces.join(":")))
}

/// Similarity 0..=100. Exactly 100 only for identical fingerprints;
/// everything else is Jaccard over the two piece sets, capped at 99.
/// Fingerprints computed at different trigger granularities score 0.
pub(super) fn similarity(a: &str, b: &str) -> Result<u32, CodecError> {
    if a == b {
        // identical digest, still validate the shape
        decode(a)?;
        return Ok(100);
    }
    let (modulus_a, pieces_a) = decode(a)?;
    let (modulus_b, pieces_b) = decode(b)?;
    if modulus_a != modulus_b {
        return Ok(0);
    }

    let set_a: HashSet<&str> = pieces_a.iter().copied().collect();
    let set_b: HashSet<&str> = pieces_b.iter().copied().collect();
    let shared = set_a.intersection(&set_b).count();
    if shared == 0 {
        return Ok(0);
    }
    let union = set_a.len() + set_b.len() - shared;
    let score = (shared * 100 / union) as u32;
    Ok(score.min(99))
}

/// Smallest power-of-two trigger modulus (floor 64) that keeps the
/// expected piece count near [`TARGET_PIECES`].
fn trigger_modulus(len: usize) -> u64 {
    let mut modulus = MIN_TRIGGER;
    while len as u64 > modulus * TARGET_PIECES {
        modulus *= 2;
    }
    modulus
}

fn hash_piece(piece: &[u8]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(piece);
    let mut out = [0u8; PIECE_HASH_BYTES];
    hasher.finalize_xof().fill(&mut out);
    hex::encode(out)
}

fn decode(fingerprint: &str) -> Result<(u64, Vec<&str>), CodecError> {
    let malformed = |detail: &str| CodecError::MalformedFingerprint {
        scheme: Scheme::Ctph,
        detail: detail.to_string(),
    };
    let mut parts = fingerprint.split(':');
    let modulus: u64 = parts
        .next()
        .unwrap_or_default()
        .parse()
        .map_err(|_| malformed("bad trigger modulus"))?;
    if modulus == 0 {
        return Err(malformed("zero trigger modulus"));
    }
    let pieces: Vec<&str> = parts.collect();
    if pieces.is_empty() {
        return Err(malformed("no piece hashes"));
    }
    for piece in &pieces {
        if piece.len() != PIECE_HASH_BYTES * 2 || !piece.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(malformed("bad piece hash"));
        }
    }
    Ok((modulus, pieces))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text(paragraphs: usize) -> Vec<u8> {
        let mut out = String::new();
        for i in 0..paragraphs {
            out.push_str(&format!(
                "Paragraph {i}: the quick brown fox jumps over the lazy dog \
                 while {i} ships sail past the harbour light.\n"
            ));
        }
        out.into_bytes()
    }

    fn noise(len: usize, mut seed: u64) -> Vec<u8> {
        (0..len)
            .map(|_| {
                seed = seed
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (seed >> 33) as u8
            })
            .collect()
    }

    #[test]
    fn self_similarity_is_100() {
        let fp = compute(&sample_text(100)).unwrap();
        assert_eq!(similarity(&fp, &fp).unwrap(), 100);
    }

    #[test]
    fn rejects_input_below_floor() {
        let content = sample_text(10); // well under 4096 bytes
        let err = compute(&content).unwrap_err();
        assert!(matches!(
            err,
            CodecError::InputTooSmall { scheme: Scheme::Ctph, min: CTPH_MIN_INPUT, .. }
        ));
    }

    #[test]
    fn local_edit_keeps_high_similarity() {
        let base = sample_text(100);
        let mut edited = base.clone();
        let patch = b"A COMPLETELY DIFFERENT SENTENCE SITS HERE NOW";
        let mid = edited.len() / 2;
        edited[mid..mid + patch.len()].copy_from_slice(patch);

        let fp_base = compute(&base).unwrap();
        let fp_edited = compute(&edited).unwrap();
        let score = similarity(&fp_base, &fp_edited).unwrap();
        assert!(score > 0 && score < 100, "score={score}");
        assert_eq!(score, similarity(&fp_edited, &fp_base).unwrap());
    }

    #[test]
    fn unrelated_content_scores_zero() {
        let fp_text = compute(&sample_text(100)).unwrap();
        let fp_noise = compute(&noise(sample_text(100).len(), 99)).unwrap();
        assert_eq!(similarity(&fp_text, &fp_noise).unwrap(), 0);
    }

    #[test]
    fn different_granularities_are_incomparable() {
        let small = compute(&sample_text(45)).unwrap(); // ~4.7 KiB
        let large = compute(&sample_text(2000)).unwrap(); // ~210 KiB
        assert_eq!(similarity(&small, &large).unwrap(), 0);
    }

    #[test]
    fn rejects_malformed_fingerprints() {
        let fp = compute(&sample_text(100)).unwrap();
        for bad in ["", "64", "64:zzzz", "0:deadbeef", "garbage:deadbeef"] {
            assert!(
                matches!(
                    similarity(bad, &fp),
                    Err(CodecError::MalformedFingerprint { scheme: Scheme::Ctph, .. })
                ),
                "accepted {bad:?}"
            );
        }
    }
}
