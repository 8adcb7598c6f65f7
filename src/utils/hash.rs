//! Hashing utilities.
//!
//! - `compute` / `fingerprint`: fast FxHash for short tags (staging dirs, cache keys)
//! - `generate_identifier`: blake3-derived resource ids in the `8-4-4-4-12` form
//! - `is_valid_identifier`: ids that are safe to turn into directories
//!
//! # Usage
//!
//! ```ignore
//! use crate::utils::hash;
//!
//! let fp = hash::fingerprint("demo"); // -> "a1b2c3d4"
//! let id = hash::generate_identifier("/about/"); // -> "4bd6c1a2-..."
//! ```

use rustc_hash::FxHasher;
use std::hash::Hasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Compute 64-bit hash from byte data.
#[inline]
pub fn compute<T: AsRef<[u8]> + ?Sized>(data: &T) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(data.as_ref());
    hasher.finish()
}

/// Compute hash and return as 8-char hex fingerprint.
#[inline]
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(value: &T) -> String {
    format!("{:016x}", compute(value))[..8].to_string()
}

/// Monotonic counter mixed into every generated identifier.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a fresh resource identifier.
///
/// The seed (usually the resource path) is hashed together with the current
/// time and a process-wide sequence number, so two calls never collide even
/// with the same seed.
pub fn generate_identifier(seed: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);

    let mut hasher = blake3::Hasher::new();
    hasher.update(seed.as_bytes());
    hasher.update(&nanos.to_le_bytes());
    hasher.update(&sequence.to_le_bytes());
    hasher.update(&std::process::id().to_le_bytes());

    let digest = hex::encode(&hasher.finalize().as_bytes()[..16]);
    format!(
        "{}-{}-{}-{}-{}",
        &digest[0..8],
        &digest[8..12],
        &digest[12..16],
        &digest[16..20],
        &digest[20..32]
    )
}

/// Whether `id` consists of non-empty ASCII alphanumeric parts joined by `-`.
///
/// Every part becomes one directory level, so anything else (separators,
/// `..`, absolute paths, empty parts) is rejected.
pub fn is_valid_identifier(id: &str) -> bool {
    !id.is_empty()
        && id
            .split('-')
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_alphanumeric()))
}
