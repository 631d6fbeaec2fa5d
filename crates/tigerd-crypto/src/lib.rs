//! Cryptographic primitives behind the tigerd JOSE layer.
//!
//! Everything here operates on concrete key types (`RsaPrivateKey`,
//! `p256::SecretKey`, raw secrets) and byte strings. JWK parsing, header
//! handling and key selection live in `tigerd-jose`.

pub mod base64url;
pub mod content;
pub mod digest;
pub mod ec;
pub mod ecdh;
pub mod error;
pub mod keywrap;
pub mod random;
pub mod signing;

pub use base64url::{base64url_decode, base64url_decode_left_padded, base64url_encode};
pub use content::{aes_gcm_decrypt, aes_gcm_encrypt, random_iv, Sealed, GCM_IV_LENGTH};
pub use digest::HashSize;
pub use ec::{
    p256_coordinates, p256_public_from_coordinates, p384_coordinates,
    p384_public_from_coordinates, P256_FIELD_LENGTH, P384_FIELD_LENGTH,
};
pub use ecdh::{ecdh_es_recipient, ecdh_es_sender, KdfParams};
pub use error::CryptoError;
pub use keywrap::{
    aes_gcm_kw_unwrap, aes_gcm_kw_wrap, aes_kw_unwrap, aes_kw_wrap, rsa_decrypt_key,
    rsa_encrypt_key, GcmWrapped, RsaPadding,
};
pub use random::{fill_random, random_bytes};
pub use signing::{
    hmac_sign, hmac_verify, p256_sign, p256_verify, p384_sign, p384_verify, rsa_pkcs1v15_sign,
    rsa_pkcs1v15_verify, rsa_pss_sign, rsa_pss_verify,
};
