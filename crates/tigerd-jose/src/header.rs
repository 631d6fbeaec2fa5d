//! JOSE protected header shared by JWS and JWE compact tokens.

use serde::{Deserialize, Serialize};
use tigerd_crypto::{base64url_decode, base64url_encode};

use crate::error::DecodeError;

/// Header members this crate reads or writes. Unknown members are ignored
/// unless `crit` names them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cty: Option<String>,
    /// Sender's ephemeral key for ECDH-ES.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epk: Option<EphemeralKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apv: Option<String>,
    /// AES-GCM key wrap IV.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    /// AES-GCM key wrap tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Critical extensions. None are understood, so any value is rejected on parse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crit: Option<Vec<String>>,
}

/// Public EC key as carried in `epk`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EphemeralKey {
    pub kty: String,
    pub crv: String,
    pub x: String,
    pub y: String,
}

impl Header {
    pub(crate) fn to_base64(&self) -> Result<String, serde_json::Error> {
        Ok(base64url_encode(&serde_json::to_vec(self)?))
    }

    pub(crate) fn from_base64(part: &str) -> Result<Self, DecodeError> {
        let bytes = base64url_decode(part)
            .map_err(|e| DecodeError::MalformedToken(format!("header: {e}")))?;
        let header: Self = serde_json::from_slice(&bytes)
            .map_err(|e| DecodeError::MalformedToken(format!("header: {e}")))?;
        header.check_critical()?;
        Ok(header)
    }

    fn check_critical(&self) -> Result<(), DecodeError> {
        match &self.crit {
            Some(crit) => Err(DecodeError::MalformedToken(format!(
                "unsupported critical header [{}]",
                crit.join(", ")
            ))),
            None => Ok(()),
        }
    }

    /// `kid` and `alg`, both required to pick a key.
    pub(crate) fn key_selector(&self) -> Result<(&str, &str), DecodeError> {
        let kid = non_empty(&self.kid).ok_or(DecodeError::MissingHeader("kid"))?;
        let alg = non_empty(&self.alg).ok_or(DecodeError::MissingHeader("alg"))?;
        Ok((kid, alg))
    }

    pub(crate) fn is_nested_jwt(&self) -> bool {
        self.cty
            .as_deref()
            .is_some_and(|cty| cty.eq_ignore_ascii_case("JWT"))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Split a compact token into exactly `N` dot-separated parts.
pub(crate) fn split_compact<const N: usize>(token: &str) -> Result<[&str; N], DecodeError> {
    let parts: Vec<&str> = token.split('.').collect();
    parts.try_into().map_err(|parts: Vec<&str>| {
        DecodeError::MalformedToken(format!("expected {N} parts, got {}", parts.len()))
    })
}

pub(crate) fn decode_part(part: &str, name: &str) -> Result<Vec<u8>, DecodeError> {
    base64url_decode(part).map_err(|e| DecodeError::MalformedToken(format!("{name}: {e}")))
}
