//! JWE compact serialization (RFC 7516).
//!
//! Content is always encrypted with AES-GCM under a fresh CEK. The CEK is
//! transported according to the key-management algorithm:
//! - `RSA1_5`, `RSA-OAEP`, `RSA-OAEP-256`: RSA encryption of the CEK
//! - `AxxxKW`: AES key wrap under the shared secret
//! - `AxxxGCMKW`: AES-GCM key wrap, IV and tag go in the header
//! - `ECDH-ES`: the Concat KDF output is the CEK, encrypted key is empty
//! - `ECDH-ES+AxxxKW`: the Concat KDF output wraps the CEK
//!
//! The AAD is the ASCII of the base64url protected header.

use tigerd_crypto::{
    aes_gcm_decrypt, aes_gcm_encrypt, aes_gcm_kw_unwrap, aes_gcm_kw_wrap, aes_kw_unwrap,
    aes_kw_wrap, base64url_decode, base64url_decode_left_padded, base64url_encode,
    ecdh_es_recipient, ecdh_es_sender, p256_coordinates, p256_public_from_coordinates,
    random_bytes, random_iv, rsa_decrypt_key, rsa_encrypt_key, KdfParams, RsaPadding,
    P256_FIELD_LENGTH,
};
use zeroize::Zeroizing;

use crate::alg::{EncryptionAlgorithm, EncryptionEncoding};
use crate::error::{DecodeError, EncodeError, KeyError};
use crate::header::{decode_part, split_compact, EphemeralKey, Header};
use crate::jwk::{Key, KeyMaterial};
use crate::jws::rsa_public;

/// How the CEK travels for a given key-management algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyManagement {
    Rsa(RsaPadding),
    AesKw(usize),
    AesGcmKw(usize),
    EcdhEsDirect,
    EcdhEsKw(usize),
}

impl KeyManagement {
    fn of(alg: EncryptionAlgorithm) -> Result<Self, KeyError> {
        use EncryptionAlgorithm as E;
        Ok(match alg {
            E::Rsa1_5 => Self::Rsa(RsaPadding::Pkcs1v15),
            E::RsaOaep => Self::Rsa(RsaPadding::OaepSha1),
            E::RsaOaep256 => Self::Rsa(RsaPadding::OaepSha256),
            E::A128Kw => Self::AesKw(16),
            E::A192Kw => Self::AesKw(24),
            E::A256Kw => Self::AesKw(32),
            E::A128GcmKw => Self::AesGcmKw(16),
            E::A192GcmKw => Self::AesGcmKw(24),
            E::A256GcmKw => Self::AesGcmKw(32),
            E::EcdhEs => Self::EcdhEsDirect,
            E::EcdhEsA128Kw => Self::EcdhEsKw(16),
            E::EcdhEsA192Kw => Self::EcdhEsKw(24),
            E::EcdhEsA256Kw => Self::EcdhEsKw(32),
            _ => return Err(KeyError::UnsupportedAlgorithm(alg.to_string())),
        })
    }
}

/// CEK length in bytes for a supported content encoding.
fn cek_length(enc: EncryptionEncoding) -> Result<usize, KeyError> {
    match enc {
        EncryptionEncoding::A128Gcm => Ok(16),
        EncryptionEncoding::A192Gcm => Ok(24),
        EncryptionEncoding::A256Gcm => Ok(32),
        _ => Err(KeyError::UnsupportedAlgorithm(enc.to_string())),
    }
}

fn incompatible(key: &Key, alg: EncryptionAlgorithm) -> KeyError {
    KeyError::IncompatibleKey {
        kid: key.kid().to_string(),
        alg: alg.to_string(),
    }
}

/// Shared secret of a key-wrap key, checked against the wrap width.
fn wrapping_secret(key: &Key, alg: EncryptionAlgorithm, len: usize) -> Result<&[u8], KeyError> {
    match key.material() {
        KeyMaterial::Octet(secret) if secret.len() == len => Ok(secret.as_slice()),
        _ => Err(incompatible(key, alg)),
    }
}

fn recipient_p256(key: &Key, alg: EncryptionAlgorithm) -> Result<p256::PublicKey, KeyError> {
    match key.material() {
        KeyMaterial::P256Public(public) => Ok(public.clone()),
        KeyMaterial::P256Private(secret) => Ok(secret.public_key()),
        _ => Err(incompatible(key, alg)),
    }
}

/// Encrypt `plaintext` for `key`. `header` already carries `kid` and `cty`.
pub(crate) fn encrypt_compact(
    alg: EncryptionAlgorithm,
    enc: EncryptionEncoding,
    key: &Key,
    mut header: Header,
    plaintext: &[u8],
) -> Result<String, EncodeError> {
    let cek_len = cek_length(enc)?;
    let management = KeyManagement::of(alg)?;

    let (cek, encrypted_key) = match management {
        KeyManagement::Rsa(padding) => {
            let public = rsa_public(key.material()).ok_or_else(|| incompatible(key, alg))?;
            let cek = Zeroizing::new(random_bytes(cek_len)?);
            let encrypted_key = rsa_encrypt_key(padding, public, &cek)?;
            (cek, encrypted_key)
        }
        KeyManagement::AesKw(len) => {
            let kek = wrapping_secret(key, alg, len)?;
            let cek = Zeroizing::new(random_bytes(cek_len)?);
            let encrypted_key = aes_kw_wrap(kek, &cek)?;
            (cek, encrypted_key)
        }
        KeyManagement::AesGcmKw(len) => {
            let kek = wrapping_secret(key, alg, len)?;
            let cek = Zeroizing::new(random_bytes(cek_len)?);
            let wrapped = aes_gcm_kw_wrap(kek, &cek)?;
            header.iv = Some(base64url_encode(&wrapped.iv));
            header.tag = Some(base64url_encode(&wrapped.tag));
            (cek, wrapped.encrypted_key)
        }
        KeyManagement::EcdhEsDirect => {
            let recipient = recipient_p256(key, alg)?;
            let params = KdfParams {
                algorithm_id: enc.as_str(),
                apu: &[],
                apv: &[],
                key_bits: cek_len * 8,
            };
            let (cek, ephemeral) = ecdh_es_sender(&recipient, params);
            header.epk = Some(ephemeral_jwk(&ephemeral)?);
            (cek, Vec::new())
        }
        KeyManagement::EcdhEsKw(len) => {
            let recipient = recipient_p256(key, alg)?;
            let params = KdfParams {
                algorithm_id: alg.as_str(),
                apu: &[],
                apv: &[],
                key_bits: len * 8,
            };
            let (kek, ephemeral) = ecdh_es_sender(&recipient, params);
            header.epk = Some(ephemeral_jwk(&ephemeral)?);
            let cek = Zeroizing::new(random_bytes(cek_len)?);
            let encrypted_key = aes_kw_wrap(&kek, &cek)?;
            (cek, encrypted_key)
        }
    };

    header.alg = Some(alg.to_string());
    header.enc = Some(enc.to_string());
    let header_b64 = header.to_base64()?;

    let iv = random_iv()?;
    let sealed = aes_gcm_encrypt(&cek, &iv, header_b64.as_bytes(), plaintext)?;

    Ok(format!(
        "{}.{}.{}.{}.{}",
        header_b64,
        base64url_encode(&encrypted_key),
        base64url_encode(&iv),
        base64url_encode(&sealed.ciphertext),
        base64url_encode(&sealed.tag),
    ))
}

/// A parsed but still encrypted JWE.
pub(crate) struct CompactJwe<'t> {
    pub header: Header,
    header_b64: &'t str,
    encrypted_key: Vec<u8>,
    iv: Vec<u8>,
    ciphertext: Vec<u8>,
    tag: Vec<u8>,
}

impl<'t> CompactJwe<'t> {
    pub fn parse(token: &'t str) -> Result<Self, DecodeError> {
        let [header_b64, encrypted_key, iv, ciphertext, tag] = split_compact::<5>(token)?;
        Ok(Self {
            header: Header::from_base64(header_b64)?,
            header_b64,
            encrypted_key: decode_part(encrypted_key, "encrypted key")?,
            iv: decode_part(iv, "iv")?,
            ciphertext: decode_part(ciphertext, "ciphertext")?,
            tag: decode_part(tag, "tag")?,
        })
    }

    /// Recover the CEK with `key` and decrypt the content.
    pub fn decrypt(&self, alg: EncryptionAlgorithm, key: &Key) -> Result<Vec<u8>, DecodeError> {
        let enc_name = self
            .header
            .enc
            .as_deref()
            .filter(|enc| !enc.is_empty())
            .ok_or(DecodeError::MissingHeader("enc"))?;
        let enc: EncryptionEncoding = enc_name
            .parse()
            .map_err(|_| DecodeError::MalformedToken(format!("unknown enc {enc_name}")))?;
        let cek_len = cek_length(enc)?;

        let cek = match KeyManagement::of(alg)? {
            KeyManagement::Rsa(RsaPadding::Pkcs1v15) => {
                let KeyMaterial::RsaPrivate(private) = key.material() else {
                    return Err(incompatible(key, alg).into());
                };
                // A padding failure must surface as the same AEAD failure as a bad tag.
                let fallback = Zeroizing::new(random_bytes(cek_len).map_err(failed)?);
                match rsa_decrypt_key(RsaPadding::Pkcs1v15, private, &self.encrypted_key) {
                    Ok(cek) if cek.len() == cek_len => cek,
                    _ => fallback,
                }
            }
            KeyManagement::Rsa(padding) => {
                let KeyMaterial::RsaPrivate(private) = key.material() else {
                    return Err(incompatible(key, alg).into());
                };
                rsa_decrypt_key(padding, private, &self.encrypted_key).map_err(failed)?
            }
            KeyManagement::AesKw(len) => {
                let kek = wrapping_secret(key, alg, len)?;
                aes_kw_unwrap(kek, &self.encrypted_key).map_err(failed)?
            }
            KeyManagement::AesGcmKw(len) => {
                let kek = wrapping_secret(key, alg, len)?;
                let iv = self.header_bytes(&self.header.iv, "iv")?;
                let tag = self.header_bytes(&self.header.tag, "tag")?;
                aes_gcm_kw_unwrap(kek, &self.encrypted_key, &iv, &tag).map_err(failed)?
            }
            KeyManagement::EcdhEsDirect => {
                if !self.encrypted_key.is_empty() {
                    return Err(DecodeError::MalformedToken(
                        "ECDH-ES requires an empty encrypted key".to_string(),
                    ));
                }
                self.agree(key, alg, enc.as_str(), cek_len * 8)?
            }
            KeyManagement::EcdhEsKw(len) => {
                let kek = self.agree(key, alg, alg.as_str(), len * 8)?;
                aes_kw_unwrap(&kek, &self.encrypted_key).map_err(failed)?
            }
        };

        if cek.len() != cek_len {
            return Err(DecodeError::DecryptionFailed(format!(
                "content key is {} bytes, {enc} needs {cek_len}",
                cek.len()
            )));
        }

        aes_gcm_decrypt(
            &cek,
            &self.iv,
            self.header_b64.as_bytes(),
            &self.ciphertext,
            &self.tag,
        )
        .map_err(failed)
    }

    fn header_bytes(&self, value: &Option<String>, name: &'static str) -> Result<Vec<u8>, DecodeError> {
        let value = value.as_deref().ok_or(DecodeError::MissingHeader(name))?;
        base64url_decode(value).map_err(|e| DecodeError::MalformedToken(format!("{name}: {e}")))
    }

    /// Recipient side of ECDH-ES with the Concat KDF.
    fn agree(
        &self,
        key: &Key,
        alg: EncryptionAlgorithm,
        algorithm_id: &str,
        key_bits: usize,
    ) -> Result<Zeroizing<Vec<u8>>, DecodeError> {
        let KeyMaterial::P256Private(secret) = key.material() else {
            return Err(incompatible(key, alg).into());
        };
        let epk = self
            .header
            .epk
            .as_ref()
            .ok_or(DecodeError::MissingHeader("epk"))?;
        let ephemeral = ephemeral_public(epk)?;
        let apu = self.optional_bytes(&self.header.apu, "apu")?;
        let apv = self.optional_bytes(&self.header.apv, "apv")?;

        let params = KdfParams {
            algorithm_id,
            apu: &apu,
            apv: &apv,
            key_bits,
        };
        Ok(ecdh_es_recipient(secret, &ephemeral, params))
    }

    fn optional_bytes(&self, value: &Option<String>, name: &'static str) -> Result<Vec<u8>, DecodeError> {
        match value {
            Some(_) => self.header_bytes(value, name),
            None => Ok(Vec::new()),
        }
    }
}

fn failed(err: tigerd_crypto::CryptoError) -> DecodeError {
    DecodeError::DecryptionFailed(err.to_string())
}

fn ephemeral_jwk(key: &p256::PublicKey) -> Result<EphemeralKey, EncodeError> {
    let (x, y) = p256_coordinates(key)?;
    Ok(EphemeralKey {
        kty: "EC".to_string(),
        crv: "P-256".to_string(),
        x: base64url_encode(&x),
        y: base64url_encode(&y),
    })
}

fn ephemeral_public(epk: &EphemeralKey) -> Result<p256::PublicKey, DecodeError> {
    if epk.kty != "EC" || epk.crv != "P-256" {
        return Err(DecodeError::MalformedToken(format!(
            "unsupported epk {} {}",
            epk.kty, epk.crv
        )));
    }
    let coordinate = |value: &str, name: &str| {
        base64url_decode_left_padded(value, P256_FIELD_LENGTH)
            .map_err(|e| DecodeError::MalformedToken(format!("epk {name}: {e}")))
    };
    let x = coordinate(&epk.x, "x")?;
    let y = coordinate(&epk.y, "y")?;
    p256_public_from_coordinates(&x, &y).map_err(|e| DecodeError::MalformedToken(e.to_string()))
}
