//! Digest helpers.
//!
//! SHA-1 is only used for key identifiers, where it names a key rather than
//! protecting anything.

use aws_lc_rs::digest;

/// Computes SHA-1 of the input.
#[must_use]
pub fn sha1(data: &[u8]) -> Vec<u8> {
    digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, data)
        .as_ref()
        .to_vec()
}

/// Computes SHA-256 of the input.
#[must_use]
pub fn sha256(data: &[u8]) -> Vec<u8> {
    digest::digest(&digest::SHA256, data).as_ref().to_vec()
}

/// Lowercase hex SHA-1.
#[must_use]
pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(sha1(data))
}

/// Lowercase hex SHA-256.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}
