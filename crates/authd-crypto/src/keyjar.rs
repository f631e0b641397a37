//! Key jar: the set of signing keys the server owns.
//!
//! At startup the jar loads PEM keys from the configured paths. When none of
//! them can be loaded it generates one key per path and writes it back so the
//! next start reuses it. The first key in the jar signs new tokens; every key
//! is published for verification.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::error::{CryptoError, CryptoResult};
use crate::keys::RsaKey;

/// Ordered collection of RSA keys, addressable by key id.
#[derive(Debug, Clone, Default)]
pub struct KeyJar {
    keys: Vec<RsaKey>,
}

impl KeyJar {
    /// Creates a jar from already loaded keys.
    #[must_use]
    pub fn new(keys: Vec<RsaKey>) -> Self {
        Self { keys }
    }

    /// Loads every readable key among `paths`.
    ///
    /// Missing or malformed files are logged and skipped.
    #[must_use]
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut keys = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            match read_key(path) {
                Ok(key) => {
                    info!(path = %path.display(), kid = %key.kid(), "Loaded signing key");
                    keys.push(key);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping signing key"),
            }
        }
        Self { keys }
    }

    /// Loads keys from `paths`, generating and persisting new ones if none load.
    ///
    /// With an empty `paths` a single in-memory key is generated.
    ///
    /// # Errors
    ///
    /// Returns an error only if key generation itself fails. Write failures are
    /// logged and the generated key is still used.
    pub fn load_or_generate<P: AsRef<Path>>(paths: &[P], bits: usize) -> CryptoResult<Self> {
        let jar = Self::load(paths);
        if !jar.is_empty() {
            return Ok(jar);
        }

        if paths.is_empty() {
            warn!("No key files configured, generating an ephemeral signing key");
            return Ok(Self::new(vec![RsaKey::generate(bits)?]));
        }

        let mut keys = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let key = RsaKey::generate(bits)?;
            match write_key(path, &key) {
                Ok(()) => info!(path = %path.display(), kid = %key.kid(), "Generated signing key"),
                Err(e) => error!(path = %path.display(), error = %e, "Failed to persist signing key"),
            }
            keys.push(key);
        }
        Ok(Self::new(keys))
    }

    /// Key used for signing new tokens.
    #[must_use]
    pub fn signing_key(&self) -> Option<&RsaKey> {
        self.keys.first()
    }

    /// Looks up a key by id.
    #[must_use]
    pub fn get(&self, kid: &str) -> Option<&RsaKey> {
        self.keys.iter().find(|key| key.kid() == kid)
    }

    /// All keys, signing key first.
    #[must_use]
    pub fn keys(&self) -> &[RsaKey] {
        &self.keys
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the jar holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn read_key(path: &Path) -> CryptoResult<RsaKey> {
    let pem = std::fs::read_to_string(path).map_err(|source| CryptoError::Io {
        path: PathBuf::from(path),
        source,
    })?;
    RsaKey::from_pem(&pem)
}

fn write_key(path: &Path, key: &RsaKey) -> CryptoResult<()> {
    let pem = key.to_pem()?;
    std::fs::write(path, pem).map_err(|source| CryptoError::Io {
        path: PathBuf::from(path),
        source,
    })
}
