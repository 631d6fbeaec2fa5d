//! AES-GCM content encryption for JWE (`A128GCM`, `A192GCM`, `A256GCM`).
//!
//! The ciphertext and the 128-bit authentication tag are returned separately,
//! matching the compact serialization's distinct `ciphertext` and `tag` parts.

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{Aead, KeyInit, Nonce, Payload};
use aes_gcm::aes::Aes192;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm};

use crate::error::CryptoError;
use crate::random::fill_random;

/// AES-GCM IV length in bytes (96 bits).
pub const GCM_IV_LENGTH: usize = 12;
/// AES-GCM tag length in bytes (128 bits).
pub const GCM_TAG_LENGTH: usize = 16;

type Aes192Gcm = AesGcm<Aes192, U12>;

/// Output of [`aes_gcm_encrypt`].
#[derive(Debug, Clone)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub tag: Vec<u8>,
}

/// Generate a random 96-bit IV.
pub fn random_iv() -> Result<[u8; GCM_IV_LENGTH], CryptoError> {
    let mut iv = [0u8; GCM_IV_LENGTH];
    fill_random(&mut iv)?;
    Ok(iv)
}

/// Encrypt with AES-GCM; the key length (16, 24 or 32 bytes) selects the variant.
pub fn aes_gcm_encrypt(
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Sealed, CryptoError> {
    check_iv(iv)?;
    let mut sealed = match key.len() {
        16 => seal::<Aes128Gcm>(key, iv, aad, plaintext),
        24 => seal::<Aes192Gcm>(key, iv, aad, plaintext),
        32 => seal::<Aes256Gcm>(key, iv, aad, plaintext),
        got => Err(CryptoError::InvalidKeyLength { expected: 32, got }),
    }?;

    // aes-gcm appends the tag to the ciphertext
    let tag = sealed.split_off(sealed.len() - GCM_TAG_LENGTH);
    Ok(Sealed {
        ciphertext: sealed,
        tag,
    })
}

/// Decrypt and authenticate AES-GCM output.
pub fn aes_gcm_decrypt(
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    check_iv(iv)?;
    if tag.len() != GCM_TAG_LENGTH {
        return Err(CryptoError::DecryptionFailed(format!(
            "expected {GCM_TAG_LENGTH}-byte tag, got {}",
            tag.len()
        )));
    }

    let mut ct_with_tag = Vec::with_capacity(ciphertext.len() + tag.len());
    ct_with_tag.extend_from_slice(ciphertext);
    ct_with_tag.extend_from_slice(tag);

    match key.len() {
        16 => open::<Aes128Gcm>(key, iv, aad, &ct_with_tag),
        24 => open::<Aes192Gcm>(key, iv, aad, &ct_with_tag),
        32 => open::<Aes256Gcm>(key, iv, aad, &ct_with_tag),
        got => Err(CryptoError::InvalidKeyLength { expected: 32, got }),
    }
}

fn seal<C: Aead + KeyInit>(
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher =
        C::new_from_slice(key).map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    cipher
        .encrypt(
            Nonce::<C>::from_slice(iv),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
}

fn open<C: Aead + KeyInit>(
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    ct_with_tag: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher =
        C::new_from_slice(key).map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
    cipher
        .decrypt(
            Nonce::<C>::from_slice(iv),
            Payload {
                msg: ct_with_tag,
                aad,
            },
        )
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

fn check_iv(iv: &[u8]) -> Result<(), CryptoError> {
    if iv.len() != GCM_IV_LENGTH {
        return Err(CryptoError::InvalidIvLength {
            expected: GCM_IV_LENGTH,
            got: iv.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::random_bytes;

    #[test]
    fn round_trip_for_every_key_size() {
        for len in [16, 24, 32] {
            let key = random_bytes(len).unwrap();
            let iv = random_iv().unwrap();
            let sealed = aes_gcm_encrypt(&key, &iv, b"header", b"claims").unwrap();
            assert_eq!(sealed.tag.len(), GCM_TAG_LENGTH);
            assert_eq!(sealed.ciphertext.len(), 6);

            let plaintext =
                aes_gcm_decrypt(&key, &iv, b"header", &sealed.ciphertext, &sealed.tag).unwrap();
            assert_eq!(plaintext, b"claims");
        }
    }

    #[test]
    fn aad_is_authenticated() {
        let key = random_bytes(32).unwrap();
        let iv = random_iv().unwrap();
        let sealed = aes_gcm_encrypt(&key, &iv, b"header", b"claims").unwrap();
        assert!(aes_gcm_decrypt(&key, &iv, b"other", &sealed.ciphertext, &sealed.tag).is_err());
    }

    #[test]
    fn tampered_tag_fails() {
        let key = random_bytes(16).unwrap();
        let iv = random_iv().unwrap();
        let mut sealed = aes_gcm_encrypt(&key, &iv, b"", b"claims").unwrap();
        sealed.tag[0] ^= 0xff;
        assert!(aes_gcm_decrypt(&key, &iv, b"", &sealed.ciphertext, &sealed.tag).is_err());
    }

    #[test]
    fn rejects_unsupported_key_length() {
        let iv = random_iv().unwrap();
        let err = aes_gcm_encrypt(&[0u8; 20], &iv, b"", b"x").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKeyLength { got: 20, .. }));
    }

    #[test]
    fn rejects_short_iv() {
        let err = aes_gcm_encrypt(&[0u8; 16], &[0u8; 8], b"", b"x").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidIvLength { got: 8, .. }));
    }

    #[test]
    fn empty_plaintext_round_trips() {
        let key = random_bytes(32).unwrap();
        let iv = random_iv().unwrap();
        let sealed = aes_gcm_encrypt(&key, &iv, b"aad", b"").unwrap();
        assert!(sealed.ciphertext.is_empty());
        let plaintext = aes_gcm_decrypt(&key, &iv, b"aad", &[], &sealed.tag).unwrap();
        assert!(plaintext.is_empty());
    }
}
