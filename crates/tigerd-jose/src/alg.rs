//! JSON Web Algorithms (RFC 7518) identifiers.
//!
//! Three closed sets: signature algorithms (`alg` of a JWS), key-management
//! algorithms (`alg` of a JWE) and content encodings (`enc` of a JWE). Each has
//! a `None` sentinel, which is also the `Default`, serialized as `"none"`.
//! Parsing is exact and case-sensitive.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::KeyError;

macro_rules! algorithm_set {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum $name {
            #[default]
            None,
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            /// Every member except the sentinel.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Canonical wire string.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $name::None => "none",
                    $($name::$variant => $wire,)+
                }
            }

            pub fn is_none_or_empty(&self) -> bool {
                matches!(self, $name::None)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = KeyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    "none" => Ok($name::None),
                    $($wire => Ok($name::$variant),)+
                    _ => Err(KeyError::InvalidAlgorithm(format!("{} {}", $label, s))),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = String::deserialize(deserializer)?;
                value.parse().map_err(D::Error::custom)
            }
        }
    };
}

algorithm_set! {
    /// Algorithm used to sign and verify a JWS.
    SignatureAlgorithm, "SignatureAlgorithm" {
        Hs256 => "HS256",
        Hs384 => "HS384",
        Hs512 => "HS512",
        Rs256 => "RS256",
        Rs384 => "RS384",
        Rs512 => "RS512",
        Es256 => "ES256",
        Es384 => "ES384",
        Es512 => "ES512",
        Ps256 => "PS256",
        Ps384 => "PS384",
        Ps512 => "PS512",
    }
}

algorithm_set! {
    /// Key-management algorithm used to encrypt or agree on a JWE content key.
    EncryptionAlgorithm, "EncryptionAlgorithm" {
        Ed25519 => "ED25519",
        Rsa1_5 => "RSA1_5",
        RsaOaep => "RSA-OAEP",
        RsaOaep256 => "RSA-OAEP-256",
        A128Kw => "A128KW",
        A192Kw => "A192KW",
        A256Kw => "A256KW",
        Direct => "dir",
        EcdhEs => "ECDH-ES",
        EcdhEsA128Kw => "ECDH-ES+A128KW",
        EcdhEsA192Kw => "ECDH-ES+A192KW",
        EcdhEsA256Kw => "ECDH-ES+A256KW",
        A128GcmKw => "A128GCMKW",
        A192GcmKw => "A192GCMKW",
        A256GcmKw => "A256GCMKW",
        Pbes2Hs256A128Kw => "PBES2-HS256+A128KW",
        Pbes2Hs384A192Kw => "PBES2-HS384+A192KW",
        Pbes2Hs512A256Kw => "PBES2-HS512+A256KW",
    }
}

algorithm_set! {
    /// Content encryption (`enc`) of a JWE.
    EncryptionEncoding, "EncryptionEncoding" {
        A128CbcHs256 => "A128CBC-HS256",
        A192CbcHs384 => "A192CBC-HS384",
        A256CbcHs512 => "A256CBC-HS512",
        A128Gcm => "A128GCM",
        A192Gcm => "A192GCM",
        A256Gcm => "A256GCM",
    }
}
