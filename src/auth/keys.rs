// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API key material: generation, hashing, verification and header parsing.
//!
//! Keys are 32 random bytes rendered as lowercase hex. Only bcrypt hashes are
//! stored in the backend; comparison always goes through [`verify_api_key`].

use rand::RngCore;

/// Cost used when provisioning new keys.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

const KEY_BYTES: usize = 32;

/// Generate a fresh raw API key (64 hex characters).
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; KEY_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Hash a raw key for storage.
pub fn hash_api_key(raw_key: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(raw_key, cost)
}

/// Check a presented key against a stored bcrypt hash.
///
/// A malformed hash is a non-match, not an error: one corrupt record must not
/// make every other key of the account unusable.
pub fn verify_api_key(presented: &str, stored_hash: &str) -> bool {
    match bcrypt::verify(presented, stored_hash) {
        Ok(matched) => matched,
        Err(e) => {
            tracing::debug!(error = %e, "stored key hash could not be parsed");
            false
        }
    }
}

/// Drop the first `prefix_len` bytes of the header value.
///
/// The prefix is positional, not parsed. Only its length matters, so any tag
/// of the configured length is accepted, while a shorter or longer one shifts
/// the key and it will not verify. The remainder is not trimmed. Returns
/// `None` when nothing remains.
pub fn strip_scheme(header_value: &str, prefix_len: usize) -> Option<&str> {
    header_value
        .get(prefix_len..)
        .filter(|key| !key.is_empty())
}
