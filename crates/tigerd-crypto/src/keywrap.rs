//! Content-encryption-key transport: AES-KW, AES-GCM key wrap and RSA key encryption.

use aes_kw::{KekAes128, KekAes192, KekAes256};
use p256::elliptic_curve::rand_core::OsRng;
use rsa::{Oaep, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::content::{aes_gcm_decrypt, aes_gcm_encrypt, random_iv};
use crate::error::CryptoError;

/// AES-KW adds one 64-bit integrity block to the wrapped key.
const AES_KW_OVERHEAD: usize = 8;

/// Wrap `cek` with AES-KW (RFC 3394). The KEK length selects A128KW, A192KW or A256KW.
pub fn aes_kw_wrap(kek: &[u8], cek: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut wrapped = vec![0u8; cek.len() + AES_KW_OVERHEAD];
    let result = match kek.len() {
        16 => KekAes128::from(to_array::<16>(kek)?).wrap(cek, &mut wrapped),
        24 => KekAes192::from(to_array::<24>(kek)?).wrap(cek, &mut wrapped),
        32 => KekAes256::from(to_array::<32>(kek)?).wrap(cek, &mut wrapped),
        got => return Err(CryptoError::InvalidKeyLength { expected: 32, got }),
    };
    result.map_err(|e| CryptoError::WrapFailed(format!("{:?}", e)))?;
    Ok(wrapped)
}

/// Unwrap an AES-KW wrapped key.
pub fn aes_kw_unwrap(kek: &[u8], wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if wrapped.len() < AES_KW_OVERHEAD * 3 {
        return Err(CryptoError::UnwrapFailed(format!(
            "wrapped key too short: {} bytes",
            wrapped.len()
        )));
    }
    let mut cek = Zeroizing::new(vec![0u8; wrapped.len() - AES_KW_OVERHEAD]);
    let result = match kek.len() {
        16 => KekAes128::from(to_array::<16>(kek)?).unwrap(wrapped, &mut cek),
        24 => KekAes192::from(to_array::<24>(kek)?).unwrap(wrapped, &mut cek),
        32 => KekAes256::from(to_array::<32>(kek)?).unwrap(wrapped, &mut cek),
        got => return Err(CryptoError::InvalidKeyLength { expected: 32, got }),
    };
    result.map_err(|e| CryptoError::UnwrapFailed(format!("{:?}", e)))?;
    Ok(cek)
}

/// Result of an AES-GCM key wrap: the `iv` and `tag` travel in the JWE header.
#[derive(Debug, Clone)]
pub struct GcmWrapped {
    pub encrypted_key: Vec<u8>,
    pub iv: Vec<u8>,
    pub tag: Vec<u8>,
}

/// Wrap `cek` with AES-GCM (A128GCMKW, A192GCMKW, A256GCMKW).
pub fn aes_gcm_kw_wrap(kek: &[u8], cek: &[u8]) -> Result<GcmWrapped, CryptoError> {
    let iv = random_iv()?;
    let sealed = aes_gcm_encrypt(kek, &iv, &[], cek)
        .map_err(|e| CryptoError::WrapFailed(e.to_string()))?;
    Ok(GcmWrapped {
        encrypted_key: sealed.ciphertext,
        iv: iv.to_vec(),
        tag: sealed.tag,
    })
}

/// Unwrap an AES-GCM wrapped key.
pub fn aes_gcm_kw_unwrap(
    kek: &[u8],
    encrypted_key: &[u8],
    iv: &[u8],
    tag: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    aes_gcm_decrypt(kek, iv, &[], encrypted_key, tag)
        .map(Zeroizing::new)
        .map_err(|e| CryptoError::UnwrapFailed(e.to_string()))
}

/// RSA key-encryption padding (RSA1_5, RSA-OAEP, RSA-OAEP-256).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaPadding {
    Pkcs1v15,
    OaepSha1,
    OaepSha256,
}

/// Encrypt a CEK to an RSA public key.
pub fn rsa_encrypt_key(
    padding: RsaPadding,
    key: &RsaPublicKey,
    cek: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let mut rng = OsRng;
    match padding {
        RsaPadding::Pkcs1v15 => key.encrypt(&mut rng, Pkcs1v15Encrypt, cek),
        RsaPadding::OaepSha1 => key.encrypt(&mut rng, Oaep::new::<Sha1>(), cek),
        RsaPadding::OaepSha256 => key.encrypt(&mut rng, Oaep::new::<Sha256>(), cek),
    }
    .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
}

/// Decrypt a CEK with an RSA private key.
pub fn rsa_decrypt_key(
    padding: RsaPadding,
    key: &RsaPrivateKey,
    encrypted_key: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    match padding {
        RsaPadding::Pkcs1v15 => key.decrypt(Pkcs1v15Encrypt, encrypted_key),
        RsaPadding::OaepSha1 => key.decrypt(Oaep::new::<Sha1>(), encrypted_key),
        RsaPadding::OaepSha256 => key.decrypt(Oaep::new::<Sha256>(), encrypted_key),
    }
    .map(Zeroizing::new)
    .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

fn to_array<const N: usize>(kek: &[u8]) -> Result<[u8; N], CryptoError> {
    kek.try_into().map_err(|_| CryptoError::InvalidKeyLength {
        expected: N,
        got: kek.len(),
    })
}
