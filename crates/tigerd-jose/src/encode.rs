//! Claims to compact token: signed, encrypted, or signed then encrypted.

use std::borrow::Cow;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::alg::{EncryptionAlgorithm, EncryptionEncoding, SignatureAlgorithm};
use crate::claims::MultipleClaims;
use crate::error::EncodeError;
use crate::header::Header;
use crate::jwe;
use crate::jwk::Key;
use crate::jwks::KeySet;
use crate::jws;

const JWT: &str = "JWT";

struct Encrypter<'k> {
    alg: EncryptionAlgorithm,
    enc: EncryptionEncoding,
    key: Cow<'k, Key>,
}

/// Builds one compact token from claims and key sets.
///
/// ```no_run
/// # use tigerd_jose::*;
/// # fn run(keys: &KeySet) -> Result<String, EncodeError> {
/// let claims = StdClaims::default().with_subject("alice");
/// Encoder::new(&claims)?
///     .with_signature(SignatureAlgorithm::Rs256, keys)?
///     .with_encryption(EncryptionAlgorithm::RsaOaep256, EncryptionEncoding::A256Gcm, keys)?
///     .encode()
/// # }
/// ```
pub struct Encoder<'k> {
    claims: Vec<Map<String, Value>>,
    signer: Option<(SignatureAlgorithm, &'k Key)>,
    encrypter: Option<Encrypter<'k>>,
}

impl<'k> Encoder<'k> {
    /// Use a single value as the whole payload. `null` contributes no claims.
    pub fn new(claims: &impl Serialize) -> Result<Self, EncodeError> {
        let value = serde_json::to_value(claims)?;
        Ok(Self::with_claims(object_sources(vec![value])?))
    }

    /// Merge every source of `claims` into one payload.
    pub fn from_sources(claims: &impl MultipleClaims) -> Result<Self, EncodeError> {
        Ok(Self::with_claims(object_sources(claims.multiple_claims()?)?))
    }

    fn with_claims(claims: Vec<Map<String, Value>>) -> Self {
        Self {
            claims,
            signer: None,
            encrypter: None,
        }
    }

    /// Sign with a key bound to `alg`. The sentinel algorithm skips signing.
    pub fn with_signature(
        mut self,
        alg: SignatureAlgorithm,
        keys: &'k KeySet,
    ) -> Result<Self, EncodeError> {
        if alg.is_none_or_empty() {
            return Ok(self);
        }
        let key = keys
            .find_for_signing(alg)
            .ok_or_else(|| EncodeError::NoSigningKey(alg.to_string()))?;
        self.signer = Some((alg, key));
        Ok(self)
    }

    /// Encrypt for a key bound to `alg`. Either sentinel skips encryption.
    ///
    /// Only the public half of the key is used. Symmetric keys have none and
    /// are used as they are.
    pub fn with_encryption(
        mut self,
        alg: EncryptionAlgorithm,
        enc: EncryptionEncoding,
        keys: &'k KeySet,
    ) -> Result<Self, EncodeError> {
        if alg.is_none_or_empty() || enc.is_none_or_empty() {
            return Ok(self);
        }
        let key = keys
            .find_for_encryption(alg)
            .ok_or_else(|| EncodeError::NoEncryptionKey(alg.to_string()))?;
        let key = match key.to_public() {
            Some(public) => Cow::Owned(public),
            None => Cow::Borrowed(key),
        };
        self.encrypter = Some(Encrypter { alg, enc, key });
        Ok(self)
    }

    /// Serialize the token.
    pub fn encode(self) -> Result<String, EncodeError> {
        if self.signer.is_none() && self.encrypter.is_none() {
            return Err(EncodeError::MissingCryptoMaterial);
        }
        if self.claims.is_empty() {
            return Err(EncodeError::MissingClaims);
        }

        let payload = serde_json::to_vec(&merge(self.claims))?;

        let signed = match self.signer {
            Some((alg, key)) => {
                let header = Header {
                    alg: Some(alg.to_string()),
                    kid: Some(key.kid().to_string()),
                    typ: Some(JWT.to_string()),
                    ..Header::default()
                };
                Some(jws::sign_compact(alg, key, &header, &payload)?)
            }
            None => None,
        };

        tracing::debug!(
            signed = signed.is_some(),
            encrypted = self.encrypter.is_some(),
            "encoding token"
        );

        match (signed, self.encrypter) {
            (Some(jws), Some(encrypter)) => {
                let header = Header {
                    kid: Some(encrypter.key.kid().to_string()),
                    cty: Some(JWT.to_string()),
                    ..Header::default()
                };
                jwe::encrypt_compact(
                    encrypter.alg,
                    encrypter.enc,
                    &encrypter.key,
                    header,
                    jws.as_bytes(),
                )
            }
            (Some(jws), None) => Ok(jws),
            (None, Some(encrypter)) => {
                let header = Header {
                    kid: Some(encrypter.key.kid().to_string()),
                    ..Header::default()
                };
                jwe::encrypt_compact(
                    encrypter.alg,
                    encrypter.enc,
                    &encrypter.key,
                    header,
                    &payload,
                )
            }
            (None, None) => Err(EncodeError::MissingCryptoMaterial),
        }
    }
}

fn object_sources(values: Vec<Value>) -> Result<Vec<Map<String, Value>>, EncodeError> {
    values
        .into_iter()
        .filter(|value| !value.is_null())
        .map(|value| match value {
            Value::Object(map) => Ok(map),
            other => Err(EncodeError::InvalidClaims(format!(
                "claims must be a JSON object, got {other}"
            ))),
        })
        .collect()
}

/// Flatten sources in order; a later source overwrites an earlier one.
fn merge(sources: Vec<Map<String, Value>>) -> Map<String, Value> {
    let mut merged = Map::new();
    for source in sources {
        merged.extend(source);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{generate_encryption_key, generate_signature_key};
    use serde_json::json;

    fn hmac_keys() -> KeySet {
        KeySet::new([generate_signature_key("h", SignatureAlgorithm::Hs256, 0).unwrap()])
    }

    #[test]
    fn requires_crypto_material_before_claims() {
        let err = Encoder::new(&Value::Null).unwrap().encode().unwrap_err();
        assert!(matches!(err, EncodeError::MissingCryptoMaterial));
    }

    #[test]
    fn requires_claims() {
        let keys = hmac_keys();
        let err = Encoder::new(&Value::Null)
            .unwrap()
            .with_signature(SignatureAlgorithm::Hs256, &keys)
            .unwrap()
            .encode()
            .unwrap_err();
        assert!(matches!(err, EncodeError::MissingClaims));
    }

    #[test]
    fn rejects_non_object_claims() {
        let err = Encoder::new(&json!([1, 2])).err().unwrap();
        assert!(matches!(err, EncodeError::InvalidClaims(_)));
    }

    #[test]
    fn missing_keys_are_reported_per_side() {
        let keys = hmac_keys();
        let err = Encoder::new(&json!({}))
            .unwrap()
            .with_signature(SignatureAlgorithm::Rs256, &keys)
            .err()
            .unwrap();
        assert!(matches!(err, EncodeError::NoSigningKey(alg) if alg == "RS256"));

        let err = Encoder::new(&json!({}))
            .unwrap()
            .with_encryption(
                EncryptionAlgorithm::A128Kw,
                EncryptionEncoding::A128Gcm,
                &keys,
            )
            .err()
            .unwrap();
        assert!(matches!(err, EncodeError::NoEncryptionKey(_)));
    }

    #[test]
    fn sentinels_skip_their_step() {
        let keys = hmac_keys();
        let encoder = Encoder::new(&json!({"a": 1}))
            .unwrap()
            .with_signature(SignatureAlgorithm::None, &keys)
            .unwrap()
            .with_encryption(EncryptionAlgorithm::A128Kw, EncryptionEncoding::None, &keys)
            .unwrap();
        assert!(matches!(
            encoder.encode(),
            Err(EncodeError::MissingCryptoMaterial)
        ));
    }

    #[test]
    fn later_sources_win() {
        let merged = merge(
            object_sources(vec![
                json!({"sub": "a", "x": 1}),
                Value::Null,
                json!({"sub": "b"}),
            ])
            .unwrap(),
        );
        assert_eq!(Value::Object(merged), json!({"sub": "b", "x": 1}));
    }

    #[test]
    fn signed_header_carries_kid_and_typ() {
        let keys = hmac_keys();
        let token = Encoder::new(&json!({"sub": "alice"}))
            .unwrap()
            .with_signature(SignatureAlgorithm::Hs256, &keys)
            .unwrap()
            .encode()
            .unwrap();
        let header = Header::from_base64(token.split('.').next().unwrap()).unwrap();
        assert_eq!(header.kid.as_deref(), Some("h"));
        assert_eq!(header.alg.as_deref(), Some("HS256"));
        assert_eq!(header.typ.as_deref(), Some("JWT"));
    }

    #[test]
    fn nested_outer_header_is_marked() {
        let keys = KeySet::new([
            generate_signature_key("s", SignatureAlgorithm::Es256, 0).unwrap(),
            generate_encryption_key("e", EncryptionAlgorithm::EcdhEsA128Kw, 0).unwrap(),
        ]);
        let token = Encoder::new(&json!({"sub": "alice"}))
            .unwrap()
            .with_signature(SignatureAlgorithm::Es256, &keys)
            .unwrap()
            .with_encryption(
                EncryptionAlgorithm::EcdhEsA128Kw,
                EncryptionEncoding::A128Gcm,
                &keys,
            )
            .unwrap()
            .encode()
            .unwrap();
        assert_eq!(token.split('.').count(), 5);
        let header = Header::from_base64(token.split('.').next().unwrap()).unwrap();
        assert_eq!(header.kid.as_deref(), Some("e"));
        assert_eq!(header.cty.as_deref(), Some("JWT"));
        assert_eq!(header.enc.as_deref(), Some("A128GCM"));
    }
}
