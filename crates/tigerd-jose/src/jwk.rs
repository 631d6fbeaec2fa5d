//! A single JSON Web Key (RFC 7517) and its key material.

use std::fmt;
use std::str::FromStr;

use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use tigerd_crypto::{
    base64url_decode, base64url_decode_left_padded, base64url_encode, p256_coordinates,
    p256_public_from_coordinates, p384_coordinates, p384_public_from_coordinates,
    P256_FIELD_LENGTH, P384_FIELD_LENGTH,
};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::alg::{EncryptionAlgorithm, SignatureAlgorithm};
use crate::error::KeyError;

/// Declared purpose of a key (`use` member).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyUse {
    #[serde(rename = "sig")]
    Signing,
    #[serde(rename = "enc")]
    Encryption,
}

impl KeyUse {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyUse::Signing => "sig",
            KeyUse::Encryption => "enc",
        }
    }
}

/// Raw key material held by a [`Key`].
#[derive(Clone)]
pub enum KeyMaterial {
    /// Symmetric secret (`kty: "oct"`).
    Octet(Zeroizing<Vec<u8>>),
    RsaPrivate(Box<RsaPrivateKey>),
    RsaPublic(RsaPublicKey),
    P256Private(p256::SecretKey),
    P256Public(p256::PublicKey),
    P384Private(p384::SecretKey),
    P384Public(p384::PublicKey),
}

impl KeyMaterial {
    /// JWK `kty` value.
    pub fn key_type(&self) -> &'static str {
        match self {
            KeyMaterial::Octet(_) => "oct",
            KeyMaterial::RsaPrivate(_) | KeyMaterial::RsaPublic(_) => "RSA",
            KeyMaterial::P256Private(_)
            | KeyMaterial::P256Public(_)
            | KeyMaterial::P384Private(_)
            | KeyMaterial::P384Public(_) => "EC",
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMaterial::Octet(k) => write!(f, "Octet({} bytes)", k.len()),
            KeyMaterial::RsaPrivate(k) => write!(f, "RsaPrivate({} bits)", k.size() * 8),
            KeyMaterial::RsaPublic(k) => write!(f, "RsaPublic({} bits)", k.size() * 8),
            KeyMaterial::P256Private(_) => f.write_str("P256Private"),
            KeyMaterial::P256Public(_) => f.write_str("P256Public"),
            KeyMaterial::P384Private(_) => f.write_str("P384Private"),
            KeyMaterial::P384Public(_) => f.write_str("P384Public"),
        }
    }
}

/// A key with its identifier, intended use and algorithm.
///
/// Keys are immutable once built. Serializes to and from the JWK JSON shape.
#[derive(Debug, Clone)]
pub struct Key {
    kid: String,
    key_use: Option<KeyUse>,
    alg: String,
    material: KeyMaterial,
}

impl Key {
    /// Build a key, checking that `alg` belongs to the algorithm set matching `key_use`.
    pub fn new(
        kid: impl Into<String>,
        key_use: Option<KeyUse>,
        alg: impl Into<String>,
        material: KeyMaterial,
    ) -> Result<Self, KeyError> {
        let alg = alg.into();
        validate_algorithm(key_use, &alg)?;
        Ok(Self {
            kid: kid.into(),
            key_use,
            alg,
            material,
        })
    }

    pub(crate) fn assemble(
        kid: String,
        key_use: Option<KeyUse>,
        alg: String,
        material: KeyMaterial,
    ) -> Self {
        Self {
            kid,
            key_use,
            alg,
            material,
        }
    }

    pub(crate) fn with_kid(mut self, kid: String) -> Self {
        self.kid = kid;
        self
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn key_use(&self) -> Option<KeyUse> {
        self.key_use
    }

    pub fn algorithm(&self) -> &str {
        &self.alg
    }

    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }

    /// True for a raw symmetric secret.
    pub fn is_symmetric(&self) -> bool {
        matches!(self.material, KeyMaterial::Octet(_))
    }

    /// True for a standalone public key.
    pub fn is_public(&self) -> bool {
        matches!(
            self.material,
            KeyMaterial::RsaPublic(_) | KeyMaterial::P256Public(_) | KeyMaterial::P384Public(_)
        )
    }

    /// Public-only copy of this key, or `None` for a symmetric key.
    ///
    /// Keys exposed outside the process must go through this projection.
    pub fn to_public(&self) -> Option<Key> {
        let material = match &self.material {
            KeyMaterial::Octet(_) => return None,
            KeyMaterial::RsaPrivate(k) => KeyMaterial::RsaPublic(k.to_public_key()),
            KeyMaterial::P256Private(k) => KeyMaterial::P256Public(k.public_key()),
            KeyMaterial::P384Private(k) => KeyMaterial::P384Public(k.public_key()),
            public => public.clone(),
        };
        Some(Key {
            kid: self.kid.clone(),
            key_use: self.key_use,
            alg: self.alg.clone(),
            material,
        })
    }

    /// JWK Thumbprint (RFC 7638) with SHA-256, base64url encoded.
    pub fn thumbprint(&self) -> Result<String, KeyError> {
        let jwk = self.to_jwk()?;
        let field = |value: &Option<String>| value.clone().unwrap_or_default();

        // RFC 7638: required members only, in lexicographic order
        let input = match self.material.key_type() {
            "EC" => format!(
                r#"{{"crv":"{}","kty":"EC","x":"{}","y":"{}"}}"#,
                field(&jwk.crv),
                field(&jwk.x),
                field(&jwk.y)
            ),
            "RSA" => format!(
                r#"{{"e":"{}","kty":"RSA","n":"{}"}}"#,
                field(&jwk.e),
                field(&jwk.n)
            ),
            _ => {
                let mut k = field(&jwk.k);
                let input = format!(r#"{{"k":"{}","kty":"oct"}}"#, k);
                k.zeroize();
                input
            }
        };

        let hash = Sha256::digest(input.as_bytes());
        Ok(base64url_encode(&hash))
    }

    /// Convert into the wire representation.
    pub fn to_jwk(&self) -> Result<Jwk, KeyError> {
        let mut jwk = Jwk::bare(
            self.material.key_type(),
            &self.kid,
            self.key_use,
            &self.alg,
        );

        match &self.material {
            KeyMaterial::Octet(k) => jwk.k = Some(base64url_encode(k)),
            KeyMaterial::RsaPublic(k) => {
                jwk.n = Some(encode_biguint(k.n()));
                jwk.e = Some(encode_biguint(k.e()));
            }
            KeyMaterial::RsaPrivate(k) => {
                jwk.n = Some(encode_biguint(k.n()));
                jwk.e = Some(encode_biguint(k.e()));
                jwk.d = Some(encode_secret_biguint(k.d()));
                if let [p, q, ..] = k.primes() {
                    jwk.p = Some(encode_secret_biguint(p));
                    jwk.q = Some(encode_secret_biguint(q));
                }
                jwk.dp = k.dp().map(encode_secret_biguint);
                jwk.dq = k.dq().map(encode_secret_biguint);
                jwk.qi = k.crt_coefficient().map(|qi| encode_secret_biguint(&qi));
            }
            KeyMaterial::P256Public(k) => set_p256_public(&mut jwk, k)?,
            KeyMaterial::P256Private(k) => {
                set_p256_public(&mut jwk, &k.public_key())?;
                let mut scalar = k.to_bytes();
                jwk.d = Some(base64url_encode(&scalar));
                scalar.zeroize();
            }
            KeyMaterial::P384Public(k) => set_p384_public(&mut jwk, k)?,
            KeyMaterial::P384Private(k) => {
                set_p384_public(&mut jwk, &k.public_key())?;
                let mut scalar = k.to_bytes();
                jwk.d = Some(base64url_encode(&scalar));
                scalar.zeroize();
            }
        }

        Ok(jwk)
    }

    /// Parse a single JWK document.
    pub fn from_json(json: &str) -> Result<Self, KeyError> {
        let jwk: Jwk = serde_json::from_str(json)?;
        Key::try_from(&jwk)
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_jwk()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let jwk = Jwk::deserialize(deserializer)?;
        Key::try_from(&jwk).map_err(D::Error::custom)
    }
}

/// JWK members as they appear on the wire. Private members are wiped on drop.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Jwk {
    pub kty: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kid: String,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    #[zeroize(skip)]
    pub key_use: Option<KeyUse>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
}

impl Jwk {
    fn bare(kty: &str, kid: &str, key_use: Option<KeyUse>, alg: &str) -> Self {
        Self {
            kty: kty.to_string(),
            kid: kid.to_string(),
            key_use,
            alg: alg.to_string(),
            crv: None,
            x: None,
            y: None,
            n: None,
            e: None,
            d: None,
            p: None,
            q: None,
            dp: None,
            dq: None,
            qi: None,
            k: None,
        }
    }
}

impl TryFrom<&Jwk> for Key {
    type Error = KeyError;

    fn try_from(jwk: &Jwk) -> Result<Self, Self::Error> {
        let material = match jwk.kty.as_str() {
            "oct" => {
                let k = required(&jwk.k, "k")?;
                KeyMaterial::Octet(decode_secret(k, "k")?)
            }
            "RSA" => rsa_material(jwk)?,
            "EC" => ec_material(jwk)?,
            other => return Err(KeyError::InvalidJwk(format!("unsupported kty {other}"))),
        };
        Key::new(jwk.kid.clone(), jwk.key_use, jwk.alg.clone(), material)
    }
}

fn validate_algorithm(key_use: Option<KeyUse>, alg: &str) -> Result<(), KeyError> {
    if alg.is_empty() {
        return Ok(());
    }
    let configured = match key_use {
        Some(KeyUse::Signing) => !SignatureAlgorithm::from_str(alg)?.is_none_or_empty(),
        Some(KeyUse::Encryption) => !EncryptionAlgorithm::from_str(alg)?.is_none_or_empty(),
        None => match SignatureAlgorithm::from_str(alg) {
            Ok(sig) => !sig.is_none_or_empty(),
            Err(_) => !EncryptionAlgorithm::from_str(alg)?.is_none_or_empty(),
        },
    };
    if !configured {
        return Err(KeyError::InvalidAlgorithm(alg.to_string()));
    }
    Ok(())
}

fn rsa_material(jwk: &Jwk) -> Result<KeyMaterial, KeyError> {
    let n = decode_biguint(required(&jwk.n, "n")?, "n")?;
    let e = decode_biguint(required(&jwk.e, "e")?, "e")?;

    let Some(d) = jwk.d.as_deref() else {
        let public = RsaPublicKey::new(n, e)
            .map_err(|err| KeyError::InvalidJwk(format!("RSA public key: {err}")))?;
        return Ok(KeyMaterial::RsaPublic(public));
    };

    let d = decode_biguint(d, "d")?;
    let primes = match (jwk.p.as_deref(), jwk.q.as_deref()) {
        (Some(p), Some(q)) => vec![decode_biguint(p, "p")?, decode_biguint(q, "q")?],
        _ => Vec::new(),
    };
    let mut private = RsaPrivateKey::from_components(n, e, d, primes)
        .map_err(|err| KeyError::InvalidJwk(format!("RSA private key: {err}")))?;
    private
        .validate()
        .map_err(|err| KeyError::InvalidJwk(format!("RSA private key: {err}")))?;
    private
        .precompute()
        .map_err(|err| KeyError::InvalidJwk(format!("RSA private key: {err}")))?;
    Ok(KeyMaterial::RsaPrivate(Box::new(private)))
}

fn ec_material(jwk: &Jwk) -> Result<KeyMaterial, KeyError> {
    let crv = required(&jwk.crv, "crv")?;
    let x = required(&jwk.x, "x")?;
    let y = required(&jwk.y, "y")?;

    match crv {
        "P-256" => {
            let public = p256_public_from_coordinates(
                &decode_padded(x, P256_FIELD_LENGTH, "x")?,
                &decode_padded(y, P256_FIELD_LENGTH, "y")?,
            )
            .map_err(|e| KeyError::InvalidJwk(e.to_string()))?;
            let Some(d) = jwk.d.as_deref() else {
                return Ok(KeyMaterial::P256Public(public));
            };
            let scalar = decode_padded_secret(d, P256_FIELD_LENGTH)?;
            let secret = p256::SecretKey::from_slice(&scalar)
                .map_err(|e| KeyError::InvalidJwk(format!("P-256 scalar: {e}")))?;
            if secret.public_key() != public {
                return Err(KeyError::InvalidJwk(
                    "EC private key does not match x/y".to_string(),
                ));
            }
            Ok(KeyMaterial::P256Private(secret))
        }
        "P-384" => {
            let public = p384_public_from_coordinates(
                &decode_padded(x, P384_FIELD_LENGTH, "x")?,
                &decode_padded(y, P384_FIELD_LENGTH, "y")?,
            )
            .map_err(|e| KeyError::InvalidJwk(e.to_string()))?;
            let Some(d) = jwk.d.as_deref() else {
                return Ok(KeyMaterial::P384Public(public));
            };
            let scalar = decode_padded_secret(d, P384_FIELD_LENGTH)?;
            let secret = p384::SecretKey::from_slice(&scalar)
                .map_err(|e| KeyError::InvalidJwk(format!("P-384 scalar: {e}")))?;
            if secret.public_key() != public {
                return Err(KeyError::InvalidJwk(
                    "EC private key does not match x/y".to_string(),
                ));
            }
            Ok(KeyMaterial::P384Private(secret))
        }
        other => Err(KeyError::InvalidJwk(format!("unsupported curve {other}"))),
    }
}

fn set_p256_public(jwk: &mut Jwk, key: &p256::PublicKey) -> Result<(), KeyError> {
    let (x, y) = p256_coordinates(key).map_err(|e| KeyError::InvalidJwk(e.to_string()))?;
    jwk.crv = Some("P-256".to_string());
    jwk.x = Some(base64url_encode(&x));
    jwk.y = Some(base64url_encode(&y));
    Ok(())
}

fn set_p384_public(jwk: &mut Jwk, key: &p384::PublicKey) -> Result<(), KeyError> {
    let (x, y) = p384_coordinates(key).map_err(|e| KeyError::InvalidJwk(e.to_string()))?;
    jwk.crv = Some("P-384".to_string());
    jwk.x = Some(base64url_encode(&x));
    jwk.y = Some(base64url_encode(&y));
    Ok(())
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, KeyError> {
    value
        .as_deref()
        .ok_or_else(|| KeyError::InvalidJwk(format!("missing {name}")))
}

fn decode_secret(value: &str, name: &str) -> Result<Zeroizing<Vec<u8>>, KeyError> {
    base64url_decode(value)
        .map(Zeroizing::new)
        .map_err(|e| KeyError::InvalidJwk(format!("{name}: {e}")))
}

fn decode_padded(value: &str, len: usize, name: &str) -> Result<Vec<u8>, KeyError> {
    base64url_decode_left_padded(value, len).map_err(|e| KeyError::InvalidJwk(format!("{name}: {e}")))
}

fn decode_padded_secret(value: &str, len: usize) -> Result<Zeroizing<Vec<u8>>, KeyError> {
    decode_padded(value, len, "d").map(Zeroizing::new)
}

fn decode_biguint(value: &str, name: &str) -> Result<BigUint, KeyError> {
    let bytes = decode_secret(value, name)?;
    Ok(BigUint::from_bytes_be(&bytes))
}

fn encode_biguint(value: &BigUint) -> String {
    base64url_encode(&value.to_bytes_be())
}

fn encode_secret_biguint(value: &BigUint) -> String {
    let bytes = Zeroizing::new(value.to_bytes_be());
    base64url_encode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::elliptic_curve::rand_core::OsRng;

    // RFC 7638 §3.1
    const RFC7638_RSA: &str = r#"{
        "kty": "RSA",
        "n": "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw",
        "e": "AQAB",
        "alg": "RS256",
        "kid": "2011-04-29"
    }"#;

    fn p256_key(kid: &str) -> Key {
        let secret = p256::SecretKey::random(&mut OsRng);
        Key::new(
            kid,
            Some(KeyUse::Signing),
            "ES256",
            KeyMaterial::P256Private(secret),
        )
        .unwrap()
    }

    #[test]
    fn rfc7638_thumbprint() {
        let key = Key::from_json(RFC7638_RSA).unwrap();
        assert!(key.is_public());
        assert_eq!(key.kid(), "2011-04-29");
        assert_eq!(
            key.thumbprint().unwrap(),
            "NzbLsXh8uDCcd-6MNwXF4W_7noWXFZAfHkxZsRGC9Xs"
        );
    }

    #[test]
    fn thumbprint_ignores_private_members() {
        let key = p256_key("a");
        let public = key.to_public().unwrap();
        assert_eq!(key.thumbprint().unwrap(), public.thumbprint().unwrap());
    }

    #[test]
    fn ec_private_key_survives_json() {
        let key = p256_key("ec-1");
        let json = serde_json::to_string(&key).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["kty"], "EC");
        assert_eq!(value["crv"], "P-256");
        assert_eq!(value["use"], "sig");
        assert!(value.get("d").is_some());

        let back: Key = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kid(), "ec-1");
        assert_eq!(back.thumbprint().unwrap(), key.thumbprint().unwrap());
        assert!(!back.is_public());
    }

    #[test]
    fn public_projection_drops_private_scalar() {
        let public = p256_key("ec-2").to_public().unwrap();
        let value = serde_json::to_value(&public).unwrap();
        assert!(value.get("d").is_none());
        assert_eq!(value["alg"], "ES256");
    }

    #[test]
    fn rejects_scalar_that_does_not_match_point() {
        let a = serde_json::to_value(p256_key("a")).unwrap();
        let mut b = serde_json::to_value(p256_key("b")).unwrap();
        b["d"] = a["d"].clone();
        let err = serde_json::from_value::<Key>(b).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn symmetric_key_has_no_public_form() {
        let key = Key::from_json(r#"{"kty":"oct","kid":"s","use":"sig","alg":"HS256","k":"c2VjcmV0LXNlY3JldC1zZWNyZXQtc2VjcmV0LXNlY3JldA"}"#)
            .unwrap();
        assert!(key.is_symmetric());
        assert!(key.to_public().is_none());
    }

    #[test]
    fn algorithm_must_match_use() {
        let err = Key::from_json(r#"{"kty":"oct","use":"enc","alg":"HS256","k":"AAAA"}"#)
            .unwrap_err();
        assert!(matches!(err, KeyError::InvalidAlgorithm(_)));

        let err = Key::from_json(r#"{"kty":"oct","use":"sig","alg":"A128KW","k":"AAAA"}"#)
            .unwrap_err();
        assert!(matches!(err, KeyError::InvalidAlgorithm(_)));

        let key = Key::from_json(r#"{"kty":"oct","alg":"A128KW","k":"AAAA"}"#).unwrap();
        assert_eq!(key.key_use(), None);
    }

    #[test]
    fn unknown_key_type_is_rejected() {
        let err = Key::from_json(r#"{"kty":"OKP","crv":"Ed25519","x":"AAAA"}"#).unwrap_err();
        assert!(matches!(err, KeyError::InvalidJwk(_)));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let key = Key::from_json(r#"{"kty":"oct","k":"c2VjcmV0"}"#).unwrap();
        let debug = format!("{key:?}");
        assert!(debug.contains("Octet(6 bytes)"));
        assert!(!debug.contains("c2VjcmV0"));
    }
}
