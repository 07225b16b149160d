//! Claude Code credential record reader.
//!
//! The record is read fresh on every fetch attempt and never written.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::error::CredentialError;

/// Credential file name inside the Claude config directory
pub const CREDENTIALS_FILE: &str = ".credentials.json";

/// OAuth bearer token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// `.credentials.json` (only fields we care about)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialRecord {
    claude_ai_oauth: Option<OAuthSection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OAuthSection {
    access_token: Option<String>,
}

/// Reads the OAuth access token from a credential file
#[derive(Debug, Clone)]
pub struct CredentialProvider {
    path: PathBuf,
}

impl CredentialProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Provider for `<config_dir>/.credentials.json`
    pub fn in_dir(config_dir: &Path) -> Self {
        Self::new(config_dir.join(CREDENTIALS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record and extract `claudeAiOauth.accessToken`
    pub fn get_token(&self) -> Result<AccessToken, CredentialError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                CredentialError::Missing {
                    path: self.path.clone(),
                }
            } else {
                CredentialError::Unreadable {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        let record: CredentialRecord =
            serde_json::from_str(&content).map_err(|source| CredentialError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        record
            .claude_ai_oauth
            .and_then(|oauth| oauth.access_token)
            .filter(|token| !token.is_empty())
            .map(AccessToken)
            .ok_or_else(|| CredentialError::NoToken {
                path: self.path.clone(),
            })
    }
}
