use thiserror::Error;
use tigerd_crypto::CryptoError;

/// Key-management failures: algorithm parsing, key generation and JWK handling.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("jose key error: invalid algorithm [{0}]")]
    InvalidAlgorithm(String),

    #[error("jose key error: unsupported algorithm {0}")]
    UnsupportedAlgorithm(String),

    #[error("jose key error: too short key for {alg}, {min}+ bits required, got {bits}")]
    WeakKey {
        alg: String,
        bits: usize,
        min: usize,
    },

    #[error("jose key error: {alg} does not support a {bits}-bit key")]
    InvalidKeySize { alg: String, bits: usize },

    #[error("jose key error: key generation failed: {0}")]
    KeyGenerationFailed(String),

    #[error("jose key error: invalid JWK: {0}")]
    InvalidJwk(String),

    #[error("jose key error: key {kid} cannot be used for {alg}")]
    IncompatibleKey { kid: String, alg: String },

    #[error("jose key error: expect either file or inline option for jwks")]
    MissingSource,

    #[error("jose key error: invalid jwks definition: {0}")]
    Json(#[from] serde_json::Error),

    #[error("jose key error: failed to open jwks file: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while turning claims into a compact token.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("jose encode error: no signature key for {0}")]
    NoSigningKey(String),

    #[error("jose encode error: no encryption key for {0}")]
    NoEncryptionKey(String),

    #[error("jose encode error: claims required")]
    MissingClaims,

    #[error("jose encode error: signing or encryption key required")]
    MissingCryptoMaterial,

    #[error("jose encode error: invalid claims: {0}")]
    InvalidClaims(String),

    #[error("jose encode error: serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Key(#[from] KeyError),

    #[error("jose encode error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Failures while turning a compact token back into claims.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("jose decode error: empty token")]
    EmptyToken,

    #[error("jose decode error: no destination")]
    NoDestination,

    #[error("jose decode error: invalid configuration: {0}")]
    InvalidConfiguration(&'static str),

    #[error("jose decode error: missing {0} header")]
    MissingHeader(&'static str),

    #[error("jose decode error: no key by kid {0}")]
    KeyNotFound(String),

    #[error(
        "jose decode error: algorithm mismatch (header {header}, key {key}, expected {expected})"
    )]
    AlgorithmMismatch {
        header: String,
        key: String,
        expected: String,
    },

    #[error("jose decode error: malformed token: {0}")]
    MalformedToken(String),

    #[error("jose decode error: invalid signature")]
    InvalidSignature,

    #[error("jose decode error: decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("jose decode error: invalid claims: {0}")]
    InvalidClaims(String),

    #[error("{0}")]
    Key(#[from] KeyError),
}

/// Any failure of this crate, tagged by domain.
#[derive(Debug, Error)]
pub enum JoseError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Key(#[from] KeyError),
}

impl JoseError {
    pub fn is_encode(&self) -> bool {
        matches!(self, JoseError::Encode(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, JoseError::Decode(_))
    }

    pub fn is_key(&self) -> bool {
        matches!(self, JoseError::Key(_))
    }
}
