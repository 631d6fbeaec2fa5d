//! Where the daemon's key set comes from.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::KeyError;
use crate::jwks::KeySet;

/// A JWK Set given either as a file path or inline JSON.
///
/// Deserializes from a config section such as
/// `{"file": "/etc/tigerd/jwks.json"}`. When both are set the file wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct JwksSource {
    pub file: Option<PathBuf>,
    pub inline: Option<String>,
}

impl JwksSource {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(path.into()),
            inline: None,
        }
    }

    pub fn from_inline(json: impl Into<String>) -> Self {
        Self {
            file: None,
            inline: Some(json.into()),
        }
    }

    pub fn load(&self) -> Result<KeySet, KeyError> {
        let file = self
            .file
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty());
        if let Some(path) = file {
            tracing::debug!(path = %path.display(), "loading jwks from file");
            let reader = BufReader::new(File::open(path)?);
            return KeySet::from_reader(reader);
        }

        match self.inline.as_deref().filter(|json| !json.is_empty()) {
            Some(json) => KeySet::from_json(json),
            None => Err(KeyError::MissingSource),
        }
    }
}
