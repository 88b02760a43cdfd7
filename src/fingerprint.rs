//! Content fingerprints for sanitized submissions

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// SHA-256 of the JSON serialization of `data`, hex encoded
///
/// `BTreeMap` serializes its keys in sorted order, so equal maps always hash
/// equally regardless of insertion order.
pub fn data_hash<V: Serialize>(data: &BTreeMap<String, V>) -> String {
    // Serializing a map of strings to a Vec cannot fail.
    let bytes = serde_json::to_vec(data).unwrap_or_default();
    hex::encode(Sha256::digest(&bytes))
}
