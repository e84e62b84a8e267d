//! Locality-sensitive block hash (Scheme A).
//!
//! A sliding 5-byte window feeds four salted byte triplets into a
//! 128-bucket histogram. The fingerprint is the histogram quartile-coded
//! to 2 bits per bucket, prefixed by a 3-byte header (content checksum,
//! log-scaled length, quartile ratios). Distance sums per-bucket code
//! differences plus header penalties; similar content keeps most bucket
//! codes and scores low, unrelated content disagrees nearly everywhere.

use super::Scheme;
use crate::error::CodecError;

/// Minimum content length this scheme will fingerprint.
pub const BLOCK_MIN_INPUT: usize = 50;

const BUCKETS: usize = 128;
const WINDOW: usize = 5;
const CODE_BYTES: usize = BUCKETS / 4;
const HEADER_BYTES: usize = 3;
const VERSION_PREFIX: &str = "B1";

pub(super) fn compute(content: &[u8]) -> Result<String, CodecError> {
    if content.len() < BLOCK_MIN_INPUT {
        return Err(CodecError::InputTooSmall {
            scheme: Scheme::Block,
            min: BLOCK_MIN_INPUT,
            got: content.len(),
        });
    }

    let counts = bucket_counts(content);
    let populated = counts.iter().filter(|&&c| c > 0).count();
    if populated < BUCKETS / 2 {
        return Err(CodecError::InsufficientEntropy {
            populated,
            needed: BUCKETS / 2,
        });
    }

    // populated >= 64 guarantees q3 > 0
    let (q1, q2, q3) = quartiles(&counts);
    let mut body = [0u8; CODE_BYTES];
    for (i, &count) in counts.iter().enumerate() {
        let code: u8 = if count <= q1 {
            0
        } else if count <= q2 {
            1
        } else if count <= q3 {
            2
        } else {
            3
        };
        body[i / 4] |= code << ((i % 4) * 2);
    }

    let q1_ratio = (u64::from(q1) * 100 / u64::from(q3) % 16) as u8;
    let q2_ratio = (u64::from(q2) * 100 / u64::from(q3) % 16) as u8;
    let header = [
        checksum(content),
        length_bucket(content.len() as u64),
        (q1_ratio << 4) | q2_ratio,
    ];

    let mut fingerprint = String::with_capacity(VERSION_PREFIX.len() + (HEADER_BYTES + CODE_BYTES) * 2);
    fingerprint.push_str(VERSION_PREFIX);
    fingerprint.push_str(&hex::encode(header));
    fingerprint.push_str(&hex::encode(body));
    Ok(fingerprint)
}

/// Distance between two fingerprints: 0 iff the encodings agree everywhere,
/// growing with each bucket-code and header disagreement.
pub(super) fn distance(a: &str, b: &str) -> Result<u32, CodecError> {
    let (header_a, body_a) = decode(a)?;
    let (header_b, body_b) = decode(b)?;

    let mut dist = 0u32;
    if header_a[0] != header_b[0] {
        dist += 1;
    }
    dist += scaled(circular_diff(header_a[1], header_b[1], 256));
    dist += scaled(circular_diff(header_a[2] >> 4, header_b[2] >> 4, 16));
    dist += scaled(circular_diff(header_a[2] & 0x0f, header_b[2] & 0x0f, 16));

    for i in 0..BUCKETS {
        let d = u32::from(code_at(&body_a, i).abs_diff(code_at(&body_b, i)));
        // opposite-extreme codes weigh double
        dist += if d == 3 { 6 } else { d };
    }
    Ok(dist)
}

fn bucket_counts(content: &[u8]) -> [u32; BUCKETS] {
    let mut counts = [0u32; BUCKETS];
    for win in content.windows(WINDOW) {
        counts[bucket(2, win[0], win[1], win[2])] += 1;
        counts[bucket(3, win[0], win[1], win[3])] += 1;
        counts[bucket(5, win[0], win[2], win[3])] += 1;
        counts[bucket(7, win[0], win[2], win[4])] += 1;
    }
    counts
}

fn bucket(salt: u8, a: u8, b: u8, c: u8) -> usize {
    let mut h = salt;
    for v in [a, b, c] {
        h = h.wrapping_mul(0x95).wrapping_add(v).rotate_left(3) ^ v;
    }
    usize::from(h) % BUCKETS
}

fn quartiles(counts: &[u32; BUCKETS]) -> (u32, u32, u32) {
    let mut sorted = *counts;
    sorted.sort_unstable();
    (
        sorted[BUCKETS / 4 - 1],
        sorted[BUCKETS / 2 - 1],
        sorted[BUCKETS * 3 / 4 - 1],
    )
}

fn checksum(content: &[u8]) -> u8 {
    content
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_mul(0x95).wrapping_add(b).rotate_left(1))
}

/// Log-scaled length bucket (base 1.5), so nearby lengths share a value
/// and the distance penalty kicks in only across size classes.
fn length_bucket(len: u64) -> u8 {
    let mut level = 0u32;
    let mut cap = 1u64;
    while cap < len {
        cap = cap + cap / 2 + 1;
        level += 1;
    }
    (level & 0xff) as u8
}

fn circular_diff(a: u8, b: u8, modulus: u32) -> u32 {
    let d = u32::from(a.abs_diff(b));
    d.min(modulus - d)
}

fn scaled(d: u32) -> u32 {
    if d <= 1 { d } else { (d - 1) * 12 }
}

fn code_at(body: &[u8; CODE_BYTES], i: usize) -> u8 {
    (body[i / 4] >> ((i % 4) * 2)) & 0b11
}

fn decode(fingerprint: &str) -> Result<([u8; HEADER_BYTES], [u8; CODE_BYTES]), CodecError> {
    let malformed = |detail: &str| CodecError::MalformedFingerprint {
        scheme: Scheme::Block,
        detail: detail.to_string(),
    };
    let hex_part = fingerprint
        .strip_prefix(VERSION_PREFIX)
        .ok_or_else(|| malformed("missing version prefix"))?;
    let raw = hex::decode(hex_part).map_err(|_| malformed("not valid hex"))?;
    if raw.len() != HEADER_BYTES + CODE_BYTES {
        return Err(malformed("wrong length"));
    }
    let mut header = [0u8; HEADER_BYTES];
    header.copy_from_slice(&raw[..HEADER_BYTES]);
    let mut body = [0u8; CODE_BYTES];
    body.copy_from_slice(&raw[HEADER_BYTES..]);
    Ok((header, body))
}
