//! Error taxonomy for the usage pipeline.
//!
//! None of these ever reach the status line; [`super::UsageClient`] turns
//! each one into a stale-cache or empty-snapshot fallback.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to obtain an access token from the credential record
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential file not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read credential file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse credential file {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("credential file {} has no OAuth access token", path.display())]
    NoToken { path: PathBuf },
}

/// The endpoint answered, but not with a usable snapshot
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("unexpected status {0}")]
    Status(u16),

    #[error("undecodable body: {0}")]
    Body(#[from] serde_json::Error),
}

/// Failure of a remote usage fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Connection failure or timeout
    #[error("usage request failed: {0}")]
    Transport(#[source] ureq::Error),

    #[error("usage endpoint returned an unusable response: {0}")]
    Response(#[from] ResponseError),
}

impl From<ureq::Error> for FetchError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => FetchError::Response(ResponseError::Status(code)),
            other => FetchError::Transport(other),
        }
    }
}

/// Failure to read or write the usage cache file
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to read cache file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt cache file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write cache file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize usage snapshot: {0}")]
    Serialize(#[source] serde_json::Error),
}
