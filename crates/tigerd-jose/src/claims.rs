//! Claims payloads: the registered JWT claims and multi-source aggregation.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A payload assembled from several claims objects.
///
/// Each returned value must be a JSON object. The encoder merges them key by
/// key in order, so a later source overwrites an earlier one on a name clash.
pub trait MultipleClaims {
    fn multiple_claims(&self) -> Result<Vec<Value>, serde_json::Error>;
}

impl MultipleClaims for Vec<Value> {
    fn multiple_claims(&self) -> Result<Vec<Value>, serde_json::Error> {
        Ok(self.clone())
    }
}

/// Seconds since the Unix epoch (RFC 7519 §2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NumericDate(i64);

impl NumericDate {
    pub fn from_timestamp(seconds: i64) -> Self {
        Self(seconds)
    }

    pub fn now() -> Self {
        Utc::now().into()
    }

    pub fn timestamp(&self) -> i64 {
        self.0
    }

    /// `None` when the value is outside chrono's representable range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.0, 0).single()
    }
}

impl From<DateTime<Utc>> for NumericDate {
    fn from(time: DateTime<Utc>) -> Self {
        Self(time.timestamp())
    }
}

/// The `aud` claim. One entry is written as a string, several as an array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Audience(Vec<String>);

impl Audience {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, aud: &str) -> bool {
        self.0.iter().any(|a| a == aud)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Audience {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl Serialize for Audience {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.as_slice() {
            [single] => serializer.serialize_str(single),
            many => many.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Audience {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(single) => Ok(Self(vec![single])),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(D::Error::custom(format!(
                        "audience entries must be strings, got {other}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self),
            other => Err(D::Error::custom(format!(
                "audience must be a string or an array, got {other}"
            ))),
        }
    }
}

/// Registered claims with a fluent builder.
///
/// ```
/// use chrono::Duration;
/// use tigerd_jose::StdClaims;
///
/// let claims = StdClaims::default()
///     .generate_id()
///     .with_issuer("https://idp.example")
///     .with_issued_at_now()
///     .with_subject("alice")
///     .with_audience(["one", "two"])
///     .with_expiry_in(Duration::hours(2));
/// assert_eq!(claims.aud.unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<NumericDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<NumericDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<NumericDate>,
}

impl StdClaims {
    /// Set `jti` to a random UUID.
    pub fn generate_id(self) -> Self {
        self.with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(mut self, jti: impl Into<String>) -> Self {
        self.jti = Some(jti.into());
        self
    }

    pub fn with_issuer(mut self, iss: impl Into<String>) -> Self {
        self.iss = Some(iss.into());
        self
    }

    pub fn with_subject(mut self, sub: impl Into<String>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    /// Append audiences to any already present.
    pub fn with_audience<I, S>(mut self, aud: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let audience = self.aud.get_or_insert_with(Audience::default);
        audience.0.extend(aud.into_iter().map(Into::into));
        self
    }

    pub fn with_issued_at(mut self, iat: DateTime<Utc>) -> Self {
        self.iat = Some(iat.into());
        self
    }

    pub fn with_issued_at_now(self) -> Self {
        self.with_issued_at(Utc::now())
    }

    pub fn with_expiry(mut self, exp: DateTime<Utc>) -> Self {
        self.exp = Some(exp.into());
        self
    }

    pub fn with_expiry_in(self, duration: Duration) -> Self {
        self.with_expiry(Utc::now() + duration)
    }

    pub fn with_not_before(mut self, nbf: DateTime<Utc>) -> Self {
        self.nbf = Some(nbf.into());
        self
    }

    pub fn with_not_before_in(self, duration: Duration) -> Self {
        self.with_not_before(Utc::now() + duration)
    }
}
