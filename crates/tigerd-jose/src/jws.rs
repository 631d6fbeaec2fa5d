//! JWS compact serialization (RFC 7515) over the signing primitives.

use rsa::{RsaPrivateKey, RsaPublicKey};
use tigerd_crypto::{
    base64url_encode, hmac_sign, hmac_verify, p256_sign, p256_verify, p384_sign, p384_verify,
    rsa_pkcs1v15_sign, rsa_pkcs1v15_verify, rsa_pss_sign, rsa_pss_verify, HashSize,
};

use crate::alg::SignatureAlgorithm;
use crate::error::{DecodeError, EncodeError, KeyError};
use crate::header::{decode_part, split_compact, Header};
use crate::jwk::{Key, KeyMaterial};

/// Sign `payload` with `key`, producing `header.payload.signature`.
pub(crate) fn sign_compact(
    alg: SignatureAlgorithm,
    key: &Key,
    header: &Header,
    payload: &[u8],
) -> Result<String, EncodeError> {
    let signing_input = format!("{}.{}", header.to_base64()?, base64url_encode(payload));
    let signature = sign(alg, key, signing_input.as_bytes())?;
    Ok(format!("{signing_input}.{}", base64url_encode(&signature)))
}

/// A parsed but unverified JWS.
pub(crate) struct CompactJws<'t> {
    pub header: Header,
    signing_input: &'t str,
    payload: Vec<u8>,
    signature: Vec<u8>,
}

impl<'t> CompactJws<'t> {
    pub fn parse(token: &'t str) -> Result<Self, DecodeError> {
        let [header_b64, payload_b64, signature_b64] = split_compact::<3>(token)?;
        let header = Header::from_base64(header_b64)?;
        let payload = decode_part(payload_b64, "payload")?;
        let signature = decode_part(signature_b64, "signature")?;
        let signing_input = &token[..header_b64.len() + 1 + payload_b64.len()];
        Ok(Self {
            header,
            signing_input,
            payload,
            signature,
        })
    }

    /// Payload bytes, without any check.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Verify the signature with `key` and return the payload.
    pub fn verify(self, alg: SignatureAlgorithm, key: &Key) -> Result<Vec<u8>, DecodeError> {
        verify(alg, key, self.signing_input.as_bytes(), &self.signature)?;
        Ok(self.payload)
    }
}

fn hash_size(alg: SignatureAlgorithm) -> Option<HashSize> {
    use SignatureAlgorithm::*;
    match alg {
        Hs256 | Rs256 | Ps256 | Es256 => Some(HashSize::Sha256),
        Hs384 | Rs384 | Ps384 | Es384 => Some(HashSize::Sha384),
        Hs512 | Rs512 | Ps512 | Es512 => Some(HashSize::Sha512),
        None => Option::None,
    }
}

fn incompatible(key: &Key, alg: SignatureAlgorithm) -> KeyError {
    KeyError::IncompatibleKey {
        kid: key.kid().to_string(),
        alg: alg.to_string(),
    }
}

fn sign(alg: SignatureAlgorithm, key: &Key, input: &[u8]) -> Result<Vec<u8>, EncodeError> {
    use SignatureAlgorithm as S;

    let hash = match (alg, hash_size(alg)) {
        (S::Es512, _) | (_, None) => {
            return Err(KeyError::UnsupportedAlgorithm(alg.to_string()).into())
        }
        (_, Some(hash)) => hash,
    };

    let signature = match (alg, key.material()) {
        (S::Hs256 | S::Hs384 | S::Hs512, KeyMaterial::Octet(secret)) => {
            hmac_sign(hash, secret, input)?
        }
        (S::Rs256 | S::Rs384 | S::Rs512, KeyMaterial::RsaPrivate(private)) => {
            rsa_pkcs1v15_sign(hash, private, input)?
        }
        (S::Ps256 | S::Ps384 | S::Ps512, KeyMaterial::RsaPrivate(private)) => {
            rsa_pss_sign(hash, private, input)?
        }
        (S::Es256, KeyMaterial::P256Private(secret)) => p256_sign(secret, input)?,
        (S::Es384, KeyMaterial::P384Private(secret)) => p384_sign(secret, input)?,
        _ => return Err(incompatible(key, alg).into()),
    };
    Ok(signature)
}

fn verify(
    alg: SignatureAlgorithm,
    key: &Key,
    input: &[u8],
    signature: &[u8],
) -> Result<(), DecodeError> {
    use SignatureAlgorithm as S;

    let hash = match (alg, hash_size(alg)) {
        (S::Es512, _) | (_, None) => {
            return Err(KeyError::UnsupportedAlgorithm(alg.to_string()).into())
        }
        (_, Some(hash)) => hash,
    };

    let valid = match (alg, key.material()) {
        (S::Hs256 | S::Hs384 | S::Hs512, KeyMaterial::Octet(secret)) => {
            hmac_verify(hash, secret, input, signature)
        }
        (S::Rs256 | S::Rs384 | S::Rs512, material) => {
            let public = rsa_public(material).ok_or_else(|| incompatible(key, alg))?;
            rsa_pkcs1v15_verify(hash, public, input, signature)
        }
        (S::Ps256 | S::Ps384 | S::Ps512, material) => {
            let public = rsa_public(material).ok_or_else(|| incompatible(key, alg))?;
            rsa_pss_verify(hash, public, input, signature)
        }
        (S::Es256, KeyMaterial::P256Public(public)) => p256_verify(public, input, signature),
        (S::Es256, KeyMaterial::P256Private(secret)) => {
            p256_verify(&secret.public_key(), input, signature)
        }
        (S::Es384, KeyMaterial::P384Public(public)) => p384_verify(public, input, signature),
        (S::Es384, KeyMaterial::P384Private(secret)) => {
            p384_verify(&secret.public_key(), input, signature)
        }
        _ => return Err(incompatible(key, alg).into()),
    };

    if valid {
        Ok(())
    } else {
        Err(DecodeError::InvalidSignature)
    }
}

pub(crate) fn rsa_public(material: &KeyMaterial) -> Option<&RsaPublicKey> {
    match material {
        KeyMaterial::RsaPublic(public) => Some(public),
        KeyMaterial::RsaPrivate(private) => {
            let private: &RsaPrivateKey = private;
            Some(AsRef::<RsaPublicKey>::as_ref(private))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::generate_signature_key;

    fn header_for(key: &Key) -> Header {
        Header {
            alg: Some(key.algorithm().to_string()),
            kid: Some(key.kid().to_string()),
            typ: Some("JWT".into()),
            ..Header::default()
        }
    }

    #[test]
    fn hmac_token_verifies() {
        let key = generate_signature_key("h", SignatureAlgorithm::Hs256, 0).unwrap();
        let token = sign_compact(SignatureAlgorithm::Hs256, &key, &header_for(&key), b"{}").unwrap();
        let jws = CompactJws::parse(&token).unwrap();
        assert_eq!(jws.header.kid.as_deref(), Some("h"));
        assert_eq!(jws.verify(SignatureAlgorithm::Hs256, &key).unwrap(), b"{}");
    }

    #[test]
    fn es384_token_verifies_with_public_half() {
        let key = generate_signature_key("e", SignatureAlgorithm::Es384, 0).unwrap();
        let token = sign_compact(SignatureAlgorithm::Es384, &key, &header_for(&key), b"x").unwrap();
        let public = key.to_public().unwrap();
        let jws = CompactJws::parse(&token).unwrap();
        assert!(jws.verify(SignatureAlgorithm::Es384, &public).is_ok());
    }

    #[test]
    fn tampered_payload_fails() {
        let key = generate_signature_key("e", SignatureAlgorithm::Es256, 0).unwrap();
        let token = sign_compact(SignatureAlgorithm::Es256, &key, &header_for(&key), b"a").unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], base64url_encode(b"b"), parts[2]);
        let err = CompactJws::parse(&forged)
            .unwrap()
            .verify(SignatureAlgorithm::Es256, &key)
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidSignature));
    }

    #[test]
    fn key_type_must_fit_algorithm() {
        let key = generate_signature_key("h", SignatureAlgorithm::Hs256, 0).unwrap();
        let err = sign_compact(SignatureAlgorithm::Es256, &key, &Header::default(), b"a")
            .unwrap_err();
        assert!(matches!(
            err,
            EncodeError::Key(KeyError::IncompatibleKey { .. })
        ));
    }

    #[test]
    fn es512_is_unsupported() {
        let key = generate_signature_key("e", SignatureAlgorithm::Es256, 0).unwrap();
        let err = sign_compact(SignatureAlgorithm::Es512, &key, &Header::default(), b"a")
            .unwrap_err();
        assert!(matches!(
            err,
            EncodeError::Key(KeyError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn wrong_part_count_is_malformed() {
        assert!(matches!(
            CompactJws::parse("a.b"),
            Err(DecodeError::MalformedToken(_))
        ));
    }
}
