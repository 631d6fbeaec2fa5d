//! Key sets (RFC 7517 §5) and algorithm-driven key selection.
//!
//! A [`KeySet`] is immutable once built. Rotation happens by building a new
//! set and swapping it in, see [`crate::shared::SharedKeySet`].

use std::collections::HashMap;
use std::io::Read;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::alg::{EncryptionAlgorithm, SignatureAlgorithm};
use crate::error::KeyError;
use crate::jwk::{Key, KeyUse};

/// Keys indexed by `kid`.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: HashMap<String, Key>,
}

impl KeySet {
    /// Build a set; a later key replaces an earlier one with the same `kid`.
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Self {
        let keys = keys
            .into_iter()
            .map(|key| (key.kid().to_string(), key))
            .collect();
        Self { keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Key> {
        self.keys.values()
    }

    pub fn find_by_id(&self, kid: &str) -> Option<&Key> {
        self.keys.get(kid)
    }

    /// A signing key bound to `alg`. See [`KeySet::find_for_encryption`] for the tie-break.
    pub fn find_for_signing(&self, alg: SignatureAlgorithm) -> Option<&Key> {
        self.find_at(alg.as_str(), KeyUse::Signing, Utc::now().timestamp())
    }

    /// An encryption key bound to `alg`.
    ///
    /// When several keys qualify, candidates are ordered by `kid` and the one
    /// at `unix_seconds % candidates` is returned. Calls within the same second
    /// agree; calls across seconds rotate through the candidates.
    pub fn find_for_encryption(&self, alg: EncryptionAlgorithm) -> Option<&Key> {
        self.find_at(alg.as_str(), KeyUse::Encryption, Utc::now().timestamp())
    }

    pub(crate) fn find_at(&self, alg: &str, key_use: KeyUse, now: i64) -> Option<&Key> {
        let mut candidates: Vec<&Key> = self
            .keys
            .values()
            .filter(|key| key.key_use() == Some(key_use) && key.algorithm() == alg)
            .collect();

        match candidates.len() {
            0 => None,
            1 => candidates.pop(),
            n => {
                candidates.sort_unstable_by(|a, b| a.kid().cmp(b.kid()));
                let index = now.rem_euclid(n as i64) as usize;
                let key = candidates[index];
                debug!(
                    alg,
                    key_use = key_use.as_str(),
                    candidates = n,
                    kid = key.kid(),
                    "selected key among several candidates"
                );
                Some(key)
            }
        }
    }

    /// Union of both sets. Keys from `other` win on `kid` collisions.
    pub fn merge(&self, other: &KeySet) -> KeySet {
        if other.is_empty() {
            return self.clone();
        }
        KeySet::new(self.keys.values().chain(other.keys.values()).cloned())
    }

    /// Public projection: private halves stripped, symmetric keys dropped.
    pub fn to_public(&self) -> KeySet {
        KeySet::new(self.keys.values().filter_map(Key::to_public))
    }

    /// Read a JWK Set document.
    pub fn from_reader(reader: impl Read) -> Result<Self, KeyError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_json(json: &str) -> Result<Self, KeyError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, KeyError> {
        Ok(serde_json::to_string(self)?)
    }

    /// JWK Set document of the public projection, for serving to relying parties.
    pub fn public_json(&self) -> Result<String, KeyError> {
        self.to_public().to_json()
    }
}

#[derive(Serialize)]
struct KeySetDocumentRef<'a> {
    keys: Vec<&'a Key>,
}

#[derive(Deserialize)]
struct KeySetDocument {
    #[serde(default)]
    keys: Vec<Key>,
}

impl Serialize for KeySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut keys: Vec<&Key> = self.keys.values().collect();
        keys.sort_unstable_by(|a, b| a.kid().cmp(b.kid()));
        KeySetDocumentRef { keys }.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for KeySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = KeySetDocument::deserialize(deserializer)?;
        Ok(KeySet::new(document.keys))
    }
}
