//! Canonical fingerprints for graph snapshots.
//!
//! Values are serialized to compact JSON and hashed with xxh64. Struct fields
//! serialize in declaration order and vectors in index order, so callers
//! hashing maps must use `BTreeMap`/`BTreeSet` to keep the output stable.

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Seed shared by every fingerprint in this crate.
const FINGERPRINT_SEED: u64 = 0;

/// Serialize a value to the bytes that get hashed.
///
/// # Panics
///
/// Panics if `value` cannot be serialized to JSON, i.e. it holds a map with
/// non-string keys. Fingerprinted shapes contain only strings, sequences and
/// string-keyed maps.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("Canonical serialization failed")
}

/// Hash a serializable value.
pub fn fingerprint<T: Serialize>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), FINGERPRINT_SEED)
}

/// Hash a serializable value as 16 lowercase hex digits.
pub fn fingerprint_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", fingerprint(value))
}
