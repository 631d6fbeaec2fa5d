//! JWS signature primitives: HMAC-SHA2, RSASSA-PKCS1-v1_5, RSASSA-PSS and ECDSA.
//!
//! ECDSA signatures use the IEEE P1363 format (raw r||s) required by RFC 7518.
//! Every `*_verify` function returns `false` on malformed input instead of erroring.

use ecdsa::signature::{Signer, Verifier};
use hmac::{Hmac, Mac};
use p256::elliptic_curve::rand_core::OsRng;
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use rsa::{pkcs1v15, pss, RsaPrivateKey, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};

use crate::digest::HashSize;
use crate::error::CryptoError;

/// Compute an HMAC-SHA2 tag over `message`.
pub fn hmac_sign(hash: HashSize, secret: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match hash {
        HashSize::Sha256 => mac::<Hmac<Sha256>>(secret, message),
        HashSize::Sha384 => mac::<Hmac<Sha384>>(secret, message),
        HashSize::Sha512 => mac::<Hmac<Sha512>>(secret, message),
    }
}

/// Check an HMAC-SHA2 tag in constant time.
pub fn hmac_verify(hash: HashSize, secret: &[u8], message: &[u8], tag: &[u8]) -> bool {
    match hash {
        HashSize::Sha256 => mac_verify::<Hmac<Sha256>>(secret, message, tag),
        HashSize::Sha384 => mac_verify::<Hmac<Sha384>>(secret, message, tag),
        HashSize::Sha512 => mac_verify::<Hmac<Sha512>>(secret, message, tag),
    }
}

fn mac<M: Mac + hmac::digest::KeyInit>(secret: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut mac = <M as Mac>::new_from_slice(secret)
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn mac_verify<M: Mac + hmac::digest::KeyInit>(secret: &[u8], message: &[u8], tag: &[u8]) -> bool {
    match <M as Mac>::new_from_slice(secret) {
        Ok(mut mac) => {
            mac.update(message);
            mac.verify_slice(tag).is_ok()
        }
        Err(_) => false,
    }
}

/// Sign with RSASSA-PKCS1-v1_5 (RS256/RS384/RS512). The private operation is blinded.
pub fn rsa_pkcs1v15_sign(
    hash: HashSize,
    key: &RsaPrivateKey,
    message: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let mut rng = OsRng;
    let signature = match hash {
        HashSize::Sha256 => {
            pkcs1v15::SigningKey::<Sha256>::new(key.clone()).try_sign_with_rng(&mut rng, message)
        }
        HashSize::Sha384 => {
            pkcs1v15::SigningKey::<Sha384>::new(key.clone()).try_sign_with_rng(&mut rng, message)
        }
        HashSize::Sha512 => {
            pkcs1v15::SigningKey::<Sha512>::new(key.clone()).try_sign_with_rng(&mut rng, message)
        }
    }
    .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
    Ok(signature.to_vec())
}

/// Verify an RSASSA-PKCS1-v1_5 signature.
pub fn rsa_pkcs1v15_verify(
    hash: HashSize,
    key: &RsaPublicKey,
    message: &[u8],
    signature: &[u8],
) -> bool {
    let Ok(signature) = pkcs1v15::Signature::try_from(signature) else {
        return false;
    };
    match hash {
        HashSize::Sha256 => pkcs1v15::VerifyingKey::<Sha256>::new(key.clone())
            .verify(message, &signature)
            .is_ok(),
        HashSize::Sha384 => pkcs1v15::VerifyingKey::<Sha384>::new(key.clone())
            .verify(message, &signature)
            .is_ok(),
        HashSize::Sha512 => pkcs1v15::VerifyingKey::<Sha512>::new(key.clone())
            .verify(message, &signature)
            .is_ok(),
    }
}

/// Sign with RSASSA-PSS (PS256/PS384/PS512), salt length equal to the digest size.
pub fn rsa_pss_sign(
    hash: HashSize,
    key: &RsaPrivateKey,
    message: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let mut rng = OsRng;
    let signature = match hash {
        HashSize::Sha256 => {
            pss::BlindedSigningKey::<Sha256>::new(key.clone()).try_sign_with_rng(&mut rng, message)
        }
        HashSize::Sha384 => {
            pss::BlindedSigningKey::<Sha384>::new(key.clone()).try_sign_with_rng(&mut rng, message)
        }
        HashSize::Sha512 => {
            pss::BlindedSigningKey::<Sha512>::new(key.clone()).try_sign_with_rng(&mut rng, message)
        }
    }
    .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
    Ok(signature.to_vec())
}

/// Verify an RSASSA-PSS signature.
pub fn rsa_pss_verify(
    hash: HashSize,
    key: &RsaPublicKey,
    message: &[u8],
    signature: &[u8],
) -> bool {
    let Ok(signature) = pss::Signature::try_from(signature) else {
        return false;
    };
    match hash {
        HashSize::Sha256 => pss::VerifyingKey::<Sha256>::new(key.clone())
            .verify(message, &signature)
            .is_ok(),
        HashSize::Sha384 => pss::VerifyingKey::<Sha384>::new(key.clone())
            .verify(message, &signature)
            .is_ok(),
        HashSize::Sha512 => pss::VerifyingKey::<Sha512>::new(key.clone())
            .verify(message, &signature)
            .is_ok(),
    }
}

/// Sign with ECDSA P-256 + SHA-256 (ES256). Returns 64 bytes.
pub fn p256_sign(key: &p256::SecretKey, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let signing_key = p256::ecdsa::SigningKey::from(key);
    let signature: p256::ecdsa::Signature = signing_key
        .try_sign(message)
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
    Ok(signature.to_bytes().to_vec())
}

/// Verify an ES256 signature.
pub fn p256_verify(key: &p256::PublicKey, message: &[u8], signature: &[u8]) -> bool {
    let verifying_key = p256::ecdsa::VerifyingKey::from(key);
    match p256::ecdsa::Signature::from_slice(signature) {
        Ok(signature) => verifying_key.verify(message, &signature).is_ok(),
        Err(_) => false,
    }
}

/// Sign with ECDSA P-384 + SHA-384 (ES384). Returns 96 bytes.
pub fn p384_sign(key: &p384::SecretKey, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let signing_key = p384::ecdsa::SigningKey::from(key);
    let signature: p384::ecdsa::Signature = signing_key
        .try_sign(message)
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
    Ok(signature.to_bytes().to_vec())
}

/// Verify an ES384 signature.
pub fn p384_verify(key: &p384::PublicKey, message: &[u8], signature: &[u8]) -> bool {
    let verifying_key = p384::ecdsa::VerifyingKey::from(key);
    match p384::ecdsa::Signature::from_slice(signature) {
        Ok(signature) => verifying_key.verify(message, &signature).is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    fn rsa_key() -> &'static RsaPrivateKey {
        static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
        KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 2048).unwrap())
    }

    #[test]
    fn hmac_rfc4231_case_2() {
        let tag = hmac_sign(
            HashSize::Sha256,
            b"Jefe",
            b"what do ya want for nothing?",
        )
        .unwrap();
        assert_eq!(
            hex::encode(&tag),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn hmac_tag_lengths_follow_hash() {
        for hash in [HashSize::Sha256, HashSize::Sha384, HashSize::Sha512] {
            let tag = hmac_sign(hash, b"secret", b"message").unwrap();
            assert_eq!(tag.len(), hash.output_len());
            assert!(hmac_verify(hash, b"secret", b"message", &tag));
            assert!(!hmac_verify(hash, b"other", b"message", &tag));
        }
    }

    #[test]
    fn rsa_pkcs1v15_round_trip() {
        let key = rsa_key();
        let signature = rsa_pkcs1v15_sign(HashSize::Sha256, key, b"payload").unwrap();
        assert_eq!(signature.len(), 256);
        assert!(rsa_pkcs1v15_verify(
            HashSize::Sha256,
            &key.to_public_key(),
            b"payload",
            &signature
        ));
        assert!(!rsa_pkcs1v15_verify(
            HashSize::Sha384,
            &key.to_public_key(),
            b"payload",
            &signature
        ));
    }

    #[test]
    fn blinded_pkcs1v15_signatures_stay_deterministic() {
        let key = rsa_key();
        for hash in [HashSize::Sha256, HashSize::Sha384, HashSize::Sha512] {
            let first = rsa_pkcs1v15_sign(hash, key, b"payload").unwrap();
            let second = rsa_pkcs1v15_sign(hash, key, b"payload").unwrap();
            assert_eq!(first, second);
            assert!(rsa_pkcs1v15_verify(hash, &key.to_public_key(), b"payload", &first));
        }
    }

    #[test]
    fn rsa_pss_round_trip() {
        let key = rsa_key();
        let signature = rsa_pss_sign(HashSize::Sha512, key, b"payload").unwrap();
        assert!(rsa_pss_verify(
            HashSize::Sha512,
            &key.to_public_key(),
            b"payload",
            &signature
        ));
        assert!(!rsa_pss_verify(
            HashSize::Sha512,
            &key.to_public_key(),
            b"tampered",
            &signature
        ));
    }

    #[test]
    fn p256_round_trip() {
        let key = p256::SecretKey::random(&mut OsRng);
        let signature = p256_sign(&key, b"hello world").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(p256_verify(&key.public_key(), b"hello world", &signature));
        assert!(!p256_verify(&key.public_key(), b"tampered", &signature));
    }

    #[test]
    fn p384_round_trip() {
        let key = p384::SecretKey::random(&mut OsRng);
        let signature = p384_sign(&key, b"hello world").unwrap();
        assert_eq!(signature.len(), 96);
        assert!(p384_verify(&key.public_key(), b"hello world", &signature));
    }

    #[test]
    fn malformed_signatures_are_rejected() {
        let key = p256::SecretKey::random(&mut OsRng);
        assert!(!p256_verify(&key.public_key(), b"x", &[0u8; 3]));
        assert!(!rsa_pkcs1v15_verify(
            HashSize::Sha256,
            &rsa_key().to_public_key(),
            b"x",
            &[]
        ));
    }
}
