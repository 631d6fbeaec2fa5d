//! Token cryptography for the tigerd identity provider.
//!
//! This crate provides:
//! - Algorithm identifiers for JWS signatures, JWE key management and content encryption
//! - Keys and key sets in JWK form (RFC 7517), with RFC 7638 thumbprints
//! - Key generation with minimum strength checks
//! - An [`Encoder`] producing signed, encrypted or nested compact tokens
//! - A [`Decoder`] that peeks, verifies, decrypts, or decrypts then verifies
//!
//! Key sets are immutable. Rotation swaps a whole new set in through
//! [`SharedKeySet`].

mod alg;
mod claims;
mod decode;
mod encode;
mod error;
mod generate;
mod header;
mod jwe;
mod jwk;
mod jwks;
mod jws;
mod shared;
mod source;

pub use alg::{EncryptionAlgorithm, EncryptionEncoding, SignatureAlgorithm};
pub use claims::{Audience, MultipleClaims, NumericDate, StdClaims};
pub use decode::{ClaimsDestination, Decoder};
pub use encode::Encoder;
pub use error::{DecodeError, EncodeError, JoseError, KeyError};
pub use generate::{
    generate_encryption_key, generate_octet_key, generate_signature_key, MIN_RSA_BITS,
};
pub use header::{EphemeralKey, Header};
pub use jwk::{Jwk, Key, KeyMaterial, KeyUse};
pub use jwks::KeySet;
pub use shared::SharedKeySet;
pub use source::JwksSource;
