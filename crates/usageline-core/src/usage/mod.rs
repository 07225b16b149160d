//! Usage monitoring — fetch Claude usage limits from the OAuth usage
//! endpoint, with an on-disk cache and stale fallback.
//!
//! Every failure is absorbed inside [`UsageClient::fetch`]: callers always
//! get a snapshot, possibly stale, possibly empty.

pub mod cache;
pub mod credentials;
pub mod error;
pub mod fetcher;
pub mod types;

pub use cache::{CacheEntry, CacheStore, CACHE_FILE};
pub use credentials::{AccessToken, CredentialProvider, CREDENTIALS_FILE};
pub use error::{CacheError, CredentialError, FetchError, ResponseError};
pub use fetcher::{
    HttpUsageApi, UsageApi, UsageClient, DEFAULT_CACHE_TTL, DEFAULT_TIMEOUT, USAGE_ENDPOINT,
};
pub use types::{UsageSnapshot, Window, WindowUsage};
