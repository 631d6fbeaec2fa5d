//! ECDH-ES key agreement on P-256 (RFC 7518 §4.6).
//!
//! The shared secret is fed through the Concat KDF (NIST SP 800-56A §5.8.1).
//! With `ECDH-ES` the derived bytes are the CEK itself and the algorithm ID is
//! the `enc` value; with `ECDH-ES+AxxxKW` they are a KEK and the algorithm ID
//! is the `alg` value.

use p256::ecdh::EphemeralSecret;
use p256::elliptic_curve::rand_core::OsRng;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Inputs to the Concat KDF besides the shared secret.
#[derive(Debug, Clone, Copy)]
pub struct KdfParams<'a> {
    pub algorithm_id: &'a str,
    pub apu: &'a [u8],
    pub apv: &'a [u8],
    pub key_bits: usize,
}

/// Sender side: generate an ephemeral key, agree with `recipient` and derive key bytes.
///
/// Returns the derived bytes and the ephemeral public key to publish as `epk`.
pub fn ecdh_es_sender(
    recipient: &p256::PublicKey,
    params: KdfParams<'_>,
) -> (Zeroizing<Vec<u8>>, p256::PublicKey) {
    let ephemeral_secret = EphemeralSecret::random(&mut OsRng);
    let ephemeral_public = p256::PublicKey::from(&ephemeral_secret);
    let shared_secret = ephemeral_secret.diffie_hellman(recipient);
    let derived = concat_kdf(shared_secret.raw_secret_bytes().as_slice(), params);
    (derived, ephemeral_public)
}

/// Recipient side: agree with the sender's ephemeral key and derive the same bytes.
pub fn ecdh_es_recipient(
    recipient: &p256::SecretKey,
    ephemeral: &p256::PublicKey,
    params: KdfParams<'_>,
) -> Zeroizing<Vec<u8>> {
    let shared_secret =
        p256::ecdh::diffie_hellman(recipient.to_nonzero_scalar(), ephemeral.as_affine());
    concat_kdf(shared_secret.raw_secret_bytes().as_slice(), params)
}

/// Concat KDF with SHA-256.
///
/// Each round hashes:
///   counter(4 BE) || Z || len(algID) || algID || len(apu) || apu || len(apv) || apv || keydatalen(4 BE)
fn concat_kdf(z: &[u8], params: KdfParams<'_>) -> Zeroizing<Vec<u8>> {
    let key_len = params.key_bits / 8;
    let rounds = key_len.div_ceil(32);
    let mut output = Zeroizing::new(Vec::with_capacity(rounds * 32));

    for counter in 1..=rounds as u32 {
        let mut hasher = Sha256::new();
        hasher.update(counter.to_be_bytes());
        hasher.update(z);
        hasher.update((params.algorithm_id.len() as u32).to_be_bytes());
        hasher.update(params.algorithm_id.as_bytes());
        hasher.update((params.apu.len() as u32).to_be_bytes());
        hasher.update(params.apu);
        hasher.update((params.apv.len() as u32).to_be_bytes());
        hasher.update(params.apv);
        hasher.update((params.key_bits as u32).to_be_bytes());
        output.extend_from_slice(&hasher.finalize());
    }

    output.truncate(key_len);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base64url::base64url_decode;

    fn params(key_bits: usize) -> KdfParams<'static> {
        KdfParams {
            algorithm_id: "A128GCM",
            apu: b"",
            apv: b"",
            key_bits,
        }
    }

    #[test]
    fn sender_and_recipient_agree() {
        let recipient = p256::SecretKey::random(&mut OsRng);
        let (sent, epk) = ecdh_es_sender(&recipient.public_key(), params(256));
        let received = ecdh_es_recipient(&recipient, &epk, params(256));
        assert_eq!(sent.as_slice(), received.as_slice());
        assert_eq!(sent.len(), 32);
    }

    #[test]
    fn output_is_truncated_to_key_size() {
        assert_eq!(concat_kdf(&[7u8; 32], params(128)).len(), 16);
        assert_eq!(concat_kdf(&[7u8; 32], params(192)).len(), 24);
        assert_eq!(concat_kdf(&[7u8; 32], params(512)).len(), 64);
    }

    #[test]
    fn rfc7518_appendix_c_vector() {
        // Z from RFC 7518 Appendix C, ECDH-ES with A128GCM, apu "Alice", apv "Bob"
        let z: [u8; 32] = [
            158, 86, 217, 29, 129, 113, 53, 211, 114, 131, 66, 131, 191, 132, 38, 156, 251, 49,
            110, 163, 218, 128, 106, 72, 246, 218, 167, 121, 140, 254, 144, 196,
        ];
        let apu = base64url_decode("QWxpY2U").unwrap();
        let apv = base64url_decode("Qm9i").unwrap();
        let derived = concat_kdf(
            &z,
            KdfParams {
                algorithm_id: "A128GCM",
                apu: &apu,
                apv: &apv,
                key_bits: 128,
            },
        );
        assert_eq!(
            derived.as_slice(),
            &[86, 170, 141, 234, 248, 35, 109, 32, 92, 34, 40, 205, 113, 167, 16, 26]
        );
    }
}
