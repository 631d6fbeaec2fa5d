//! Fresh key generation.
//!
//! All randomness comes from the operating system CSPRNG. A failure to draw
//! entropy or to build the key fails the call; nothing is retried.

use p256::elliptic_curve::rand_core::OsRng;
use rsa::RsaPrivateKey;
use tigerd_crypto::fill_random;
use zeroize::Zeroizing;

use crate::alg::{EncryptionAlgorithm, SignatureAlgorithm};
use crate::error::KeyError;
use crate::jwk::{Key, KeyMaterial, KeyUse};

/// Smallest RSA modulus accepted, also the size used when none is requested.
pub const MIN_RSA_BITS: usize = 2048;

/// Generate a signing key for `alg`.
///
/// `bits` selects the RSA modulus size (0 means [`MIN_RSA_BITS`]). Elliptic
/// curve algorithms accept 0 or their own curve size. HMAC secrets always
/// match the hash width and ignore `bits`. An empty `kid` is replaced by the
/// key's RFC 7638 thumbprint.
pub fn generate_signature_key(
    kid: &str,
    alg: SignatureAlgorithm,
    bits: usize,
) -> Result<Key, KeyError> {
    use SignatureAlgorithm::*;

    let material = match alg {
        Hs256 => octet(32)?,
        Hs384 => octet(48)?,
        Hs512 => octet(64)?,
        Rs256 | Rs384 | Rs512 | Ps256 | Ps384 | Ps512 => rsa(alg.as_str(), bits)?,
        Es256 => {
            check_curve_size(alg.as_str(), bits, 256)?;
            KeyMaterial::P256Private(p256::SecretKey::random(&mut OsRng))
        }
        Es384 => {
            check_curve_size(alg.as_str(), bits, 384)?;
            KeyMaterial::P384Private(p384::SecretKey::random(&mut OsRng))
        }
        Es512 | None => return Err(KeyError::UnsupportedAlgorithm(alg.to_string())),
    };

    finish(kid, Some(KeyUse::Signing), alg.as_str(), material)
}

/// Generate a key-management key for `alg`.
///
/// RSA transport algorithms follow the same size rules as signing. The
/// ECDH-ES family runs on P-256 only. Key-wrap algorithms get a secret of the
/// wrap width.
pub fn generate_encryption_key(
    kid: &str,
    alg: EncryptionAlgorithm,
    bits: usize,
) -> Result<Key, KeyError> {
    use EncryptionAlgorithm::*;

    let material = match alg {
        Rsa1_5 | RsaOaep | RsaOaep256 => rsa(alg.as_str(), bits)?,
        EcdhEs | EcdhEsA128Kw | EcdhEsA192Kw | EcdhEsA256Kw => {
            check_curve_size(alg.as_str(), bits, 256)?;
            KeyMaterial::P256Private(p256::SecretKey::random(&mut OsRng))
        }
        A128Kw | A128GcmKw => octet(16)?,
        A192Kw | A192GcmKw => octet(24)?,
        A256Kw | A256GcmKw => octet(32)?,
        Ed25519 | Direct | Pbes2Hs256A128Kw | Pbes2Hs384A192Kw | Pbes2Hs512A256Kw | None => {
            return Err(KeyError::UnsupportedAlgorithm(alg.to_string()))
        }
    };

    finish(kid, Some(KeyUse::Encryption), alg.as_str(), material)
}

/// Generate a generic symmetric secret of `bytes` length with no use or algorithm bound.
pub fn generate_octet_key(kid: &str, bytes: usize) -> Result<Key, KeyError> {
    if bytes == 0 {
        return Err(KeyError::InvalidKeySize {
            alg: "oct".to_string(),
            bits: 0,
        });
    }
    finish(kid, None, "", octet(bytes)?)
}

fn finish(
    kid: &str,
    key_use: Option<KeyUse>,
    alg: &str,
    material: KeyMaterial,
) -> Result<Key, KeyError> {
    let key = Key::assemble(kid.to_string(), key_use, alg.to_string(), material);
    let key = if kid.is_empty() {
        let thumbprint = key.thumbprint()?;
        key.with_kid(thumbprint)
    } else {
        key
    };
    tracing::debug!(kid = key.kid(), alg, "generated key");
    Ok(key)
}

fn octet(len: usize) -> Result<KeyMaterial, KeyError> {
    let mut secret = Zeroizing::new(vec![0u8; len]);
    fill_random(&mut secret).map_err(|e| KeyError::KeyGenerationFailed(e.to_string()))?;
    Ok(KeyMaterial::Octet(secret))
}

fn rsa(alg: &str, bits: usize) -> Result<KeyMaterial, KeyError> {
    let bits = if bits == 0 { MIN_RSA_BITS } else { bits };
    if bits < MIN_RSA_BITS {
        return Err(KeyError::WeakKey {
            alg: alg.to_string(),
            bits,
            min: MIN_RSA_BITS,
        });
    }
    let key = RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| KeyError::KeyGenerationFailed(e.to_string()))?;
    Ok(KeyMaterial::RsaPrivate(Box::new(key)))
}

fn check_curve_size(alg: &str, bits: usize, curve_bits: usize) -> Result<(), KeyError> {
    if bits != 0 && bits != curve_bits {
        return Err(KeyError::InvalidKeySize {
            alg: alg.to_string(),
            bits,
        });
    }
    Ok(())
}
