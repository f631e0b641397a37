//! # authd-crypto
//!
//! Cryptographic primitives for the authd authorization server.
//!
//! - RSA signing keys and the [`KeyJar`] that loads, generates and persists them
//! - Key identifiers derived from the RSA modulus (SHA-1, hex)
//! - SHA-1 / SHA-256 digests via aws-lc-rs
//! - AES-256-GCM sealing of opaque state blobs ([`StateCipher`])
//! - Argon2id password hashing
//! - Secure random identifiers for codes and sessions

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cipher;
pub mod error;
pub mod hash;
pub mod keyjar;
pub mod keys;
pub mod password;
pub mod random;

pub use cipher::StateCipher;
pub use error::{CryptoError, CryptoResult};
pub use hash::{sha1, sha1_hex, sha256, sha256_hex};
pub use keyjar::KeyJar;
pub use keys::{key_id, RsaKey, DEFAULT_KEY_BITS};
pub use password::{hash_password, verify_password};
pub use random::{generate_access_code, generate_session_id};
