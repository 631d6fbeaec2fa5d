//! Compact token back to claims.
//!
//! The decoder runs in exactly one mode, chosen by its configuration:
//! peek (no checks), verify, decrypt, or decrypt then verify for a nested JWT.
//! Every key lookup goes by `kid` and requires the header `alg`, the key's
//! algorithm and the caller's expected algorithm to agree.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::alg::{EncryptionAlgorithm, SignatureAlgorithm};
use crate::error::DecodeError;
use crate::header::Header;
use crate::jwe::CompactJwe;
use crate::jwk::Key;
use crate::jwks::KeySet;
use crate::jws::CompactJws;

/// Something decoded claims can be written into.
///
/// Every `DeserializeOwned` type qualifies, so several typed views of the
/// same payload can be filled in one call.
pub trait ClaimsDestination {
    fn absorb(&mut self, claims: &Value) -> Result<(), serde_json::Error>;
}

impl<T: DeserializeOwned> ClaimsDestination for T {
    fn absorb(&mut self, claims: &Value) -> Result<(), serde_json::Error> {
        *self = <T as Deserialize>::deserialize(claims)?;
        Ok(())
    }
}

/// Configures how a token is checked, then extracts its claims.
#[derive(Debug, Clone, Copy)]
pub struct Decoder<'a> {
    token: &'a str,
    peek: bool,
    verification: Option<(SignatureAlgorithm, &'a KeySet)>,
    decryption: Option<(EncryptionAlgorithm, &'a KeySet)>,
}

impl<'a> Decoder<'a> {
    pub fn new(token: &'a str) -> Self {
        Self {
            token,
            peek: false,
            verification: None,
            decryption: None,
        }
    }

    /// Read the claims of a signed token without verifying it.
    ///
    /// Never base a trust decision on a peeked token.
    pub fn peek_only(mut self) -> Self {
        self.peek = true;
        self
    }

    /// Require a signature by a key from `keys` bound to `alg`. The sentinel is ignored.
    pub fn expect_signature(mut self, alg: SignatureAlgorithm, keys: &'a KeySet) -> Self {
        if !alg.is_none_or_empty() {
            self.verification = Some((alg, keys));
        }
        self
    }

    /// Require encryption to a key from `keys` bound to `alg`. The sentinel is ignored.
    pub fn expect_encryption(mut self, alg: EncryptionAlgorithm, keys: &'a KeySet) -> Self {
        if !alg.is_none_or_empty() {
            self.decryption = Some((alg, keys));
        }
        self
    }

    /// Decode into a single typed value.
    pub fn into_claims<T: DeserializeOwned>(self) -> Result<T, DecodeError> {
        let payload = self.payload()?;
        serde_json::from_slice(&payload).map_err(|e| DecodeError::InvalidClaims(e.to_string()))
    }

    pub fn into_value(self) -> Result<Value, DecodeError> {
        self.into_claims()
    }

    /// Decode into every destination; each one sees the full payload.
    pub fn into_destinations(
        self,
        destinations: &mut [&mut dyn ClaimsDestination],
    ) -> Result<(), DecodeError> {
        if self.token.is_empty() {
            return Err(DecodeError::EmptyToken);
        }
        if destinations.is_empty() {
            return Err(DecodeError::NoDestination);
        }

        let claims = self.into_value()?;
        for destination in destinations.iter_mut() {
            destination
                .absorb(&claims)
                .map_err(|e| DecodeError::InvalidClaims(e.to_string()))?;
        }
        Ok(())
    }

    fn payload(self) -> Result<Vec<u8>, DecodeError> {
        if self.token.is_empty() {
            return Err(DecodeError::EmptyToken);
        }

        if self.peek {
            if self.verification.is_some() || self.decryption.is_some() {
                return Err(DecodeError::InvalidConfiguration(
                    "peek cannot be combined with verification or decryption",
                ));
            }
            tracing::debug!("peeking token without verification");
            return Ok(CompactJws::parse(self.token)?.payload().to_vec());
        }

        match (self.verification, self.decryption) {
            (None, None) => Err(DecodeError::InvalidConfiguration(
                "expect a signature, an encryption or both",
            )),
            (Some((alg, keys)), None) => verify(self.token, alg, keys),
            (None, Some((alg, keys))) => decrypt(self.token, alg, keys),
            (Some(verification), Some((alg, keys))) => {
                let jwe = CompactJwe::parse(self.token)?;
                if !jwe.header.is_nested_jwt() {
                    return Err(DecodeError::MalformedToken(
                        "outer token is not marked as a nested JWT".to_string(),
                    ));
                }
                let key = select_key(&jwe.header, alg.as_str(), keys)?;
                let inner = jwe.decrypt(alg, key)?;
                let inner = String::from_utf8(inner)
                    .map_err(|e| DecodeError::MalformedToken(format!("nested JWT: {e}")))?;
                verify(&inner, verification.0, verification.1)
            }
        }
    }
}

fn verify(token: &str, alg: SignatureAlgorithm, keys: &KeySet) -> Result<Vec<u8>, DecodeError> {
    let jws = CompactJws::parse(token)?;
    let key = select_key(&jws.header, alg.as_str(), keys)?;
    jws.verify(alg, key)
}

fn decrypt(token: &str, alg: EncryptionAlgorithm, keys: &KeySet) -> Result<Vec<u8>, DecodeError> {
    let jwe = CompactJwe::parse(token)?;
    let key = select_key(&jwe.header, alg.as_str(), keys)?;
    jwe.decrypt(alg, key)
}

/// Look up the key named by the header and check the three algorithms agree.
fn select_key<'k>(header: &Header, expected: &str, keys: &'k KeySet) -> Result<&'k Key, DecodeError> {
    let (kid, alg) = header.key_selector()?;
    let key = keys.find_by_id(kid).ok_or_else(|| {
        tracing::warn!(kid, "no key for token kid");
        DecodeError::KeyNotFound(kid.to_string())
    })?;

    if alg != key.algorithm() || alg != expected {
        tracing::warn!(
            kid,
            header = alg,
            key = key.algorithm(),
            expected,
            "token algorithm mismatch"
        );
        return Err(DecodeError::AlgorithmMismatch {
            header: alg.to_string(),
            key: key.algorithm().to_string(),
            expected: expected.to_string(),
        });
    }
    Ok(key)
}
