//! Usage fetcher: fresh cache, else the OAuth usage endpoint, else the
//! stale cache, else nothing.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::cache::CacheStore;
use super::credentials::{AccessToken, CredentialProvider};
use super::error::{FetchError, ResponseError};
use super::types::UsageSnapshot;
use crate::clock::{Clock, SystemClock};

/// Claude OAuth usage endpoint
pub const USAGE_ENDPOINT: &str = "https://api.anthropic.com/api/oauth/usage";

/// How long a cached snapshot is trusted without asking the endpoint
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(120);

/// Upper bound on the whole usage request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const ANTHROPIC_BETA: &str = "oauth-2025-04-20";
const USER_AGENT: &str = "claude-code/2.0.31";

/// Remote source of usage snapshots
pub trait UsageApi {
    fn fetch_usage(&self, token: &AccessToken) -> Result<UsageSnapshot, FetchError>;
}

/// Blocking HTTP client for the usage endpoint
pub struct HttpUsageApi {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpUsageApi {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            endpoint: endpoint.into(),
        }
    }
}

impl Default for HttpUsageApi {
    fn default() -> Self {
        Self::new(USAGE_ENDPOINT, DEFAULT_TIMEOUT)
    }
}

impl UsageApi for HttpUsageApi {
    fn fetch_usage(&self, token: &AccessToken) -> Result<UsageSnapshot, FetchError> {
        debug!("Requesting usage from {}", self.endpoint);
        let mut response = self
            .agent
            .get(&self.endpoint)
            .header("Accept", "application/json")
            .header("Authorization", format!("Bearer {}", token.as_str()))
            .header("anthropic-beta", ANTHROPIC_BETA)
            .header("User-Agent", USER_AGENT)
            .call()?;
        let body = response.body_mut().read_to_string()?;
        parse_usage_response(&body)
    }
}

/// Decode an endpoint response body into a snapshot
pub fn parse_usage_response(body: &str) -> Result<UsageSnapshot, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Response(ResponseError::Body(e)))
}

/// Orchestrates cache, credentials and the remote endpoint.
///
/// [`UsageClient::fetch`] never fails: every error path ends in a stale
/// snapshot or an empty one.
pub struct UsageClient<A, C = SystemClock> {
    credentials: CredentialProvider,
    cache: CacheStore<C>,
    api: A,
    ttl: Duration,
}

impl<A: UsageApi> UsageClient<A, SystemClock> {
    /// Client over the credential and cache files in `config_dir`
    pub fn for_config_dir(config_dir: &Path, api: A, ttl: Duration) -> Self {
        Self::new(
            CredentialProvider::in_dir(config_dir),
            CacheStore::in_dir(config_dir),
            api,
            ttl,
        )
    }
}

impl<A: UsageApi, C: Clock> UsageClient<A, C> {
    pub fn new(credentials: CredentialProvider, cache: CacheStore<C>, api: A, ttl: Duration) -> Self {
        Self {
            credentials,
            cache,
            api,
            ttl,
        }
    }

    /// Current instant according to the client's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.cache.clock().now()
    }

    /// Best available usage snapshot.
    ///
    /// 1. Fresh cache (younger than the TTL) is returned without network I/O
    /// 2. Otherwise the endpoint is queried and a success refreshes the cache
    /// 3. On any failure the last cached snapshot is served regardless of age
    /// 4. With no cache at all, an empty snapshot
    pub fn fetch(&self) -> UsageSnapshot {
        if let Some(snapshot) = self.cache.read_if_fresh(self.ttl) {
            debug!("Usage cache hit");
            return snapshot;
        }

        match self.fetch_remote() {
            Ok(snapshot) => {
                if let Err(e) = self.cache.write(&snapshot) {
                    warn!("Failed to update usage cache: {}", e);
                }
                snapshot
            }
            Err(e) => {
                warn!("Usage fetch failed: {}", e);
                match self.cache.read_stale() {
                    Some(snapshot) => {
                        info!("Serving stale usage from {}", self.cache.path().display());
                        snapshot
                    }
                    None => UsageSnapshot::default(),
                }
            }
        }
    }

    fn fetch_remote(&self) -> Result<UsageSnapshot, FetchError> {
        let token = self.credentials.get_token()?;
        let snapshot = self.api.fetch_usage(&token)?;
        info!("Fetched usage from endpoint");
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::usage::cache::CACHE_FILE;
    use crate::usage::credentials::CREDENTIALS_FILE;
    use crate::usage::error::CredentialError;
    use crate::usage::types::WindowUsage;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::fs;
    use tempfile::TempDir;

    /// Endpoint stand-in that counts calls
    struct StubApi {
        response: Option<UsageSnapshot>,
        calls: Cell<usize>,
    }

    impl StubApi {
        fn ok(snapshot: UsageSnapshot) -> Self {
            Self {
                response: Some(snapshot),
                calls: Cell::new(0),
            }
        }

        fn unreachable() -> Self {
            Self {
                response: None,
                calls: Cell::new(0),
            }
        }
    }

    impl UsageApi for StubApi {
        fn fetch_usage(&self, token: &AccessToken) -> Result<UsageSnapshot, FetchError> {
            self.calls.set(self.calls.get() + 1);
            assert_eq!(token.as_str(), "tok");
            self.response
                .clone()
                .ok_or(FetchError::Response(ResponseError::Status(503)))
        }
    }

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn config_dir(with_credentials: bool) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        if with_credentials {
            fs::write(
                dir.path().join(CREDENTIALS_FILE),
                r#"{"claudeAiOauth": {"accessToken": "tok"}}"#,
            )
            .unwrap();
        }
        dir
    }

    fn client<A: UsageApi>(dir: &TempDir, api: A, now: &str) -> UsageClient<A, FixedClock> {
        UsageClient::new(
            CredentialProvider::in_dir(dir.path()),
            CacheStore::new(dir.path().join(CACHE_FILE), FixedClock(at(now))),
            api,
            DEFAULT_CACHE_TTL,
        )
    }

    fn cached() -> UsageSnapshot {
        UsageSnapshot {
            short_window: Some(WindowUsage::new(42.0, Some("2026-03-10T20:00:00Z"))),
            ..Default::default()
        }
    }

    fn fresh() -> UsageSnapshot {
        UsageSnapshot {
            short_window: Some(WindowUsage::new(55.0, Some("2026-03-10T20:00:00Z"))),
            long_window: Some(WindowUsage::new(12.0, Some("2026-03-14T08:00:00Z"))),
            ..Default::default()
        }
    }

    fn seed_cache(dir: &TempDir, written_at: &str) {
        CacheStore::new(dir.path().join(CACHE_FILE), FixedClock(at(written_at)))
            .write(&cached())
            .unwrap();
    }

    #[test]
    fn test_fresh_cache_skips_network() {
        let dir = config_dir(true);
        seed_cache(&dir, "2026-03-10T18:00:00Z");

        let client = client(&dir, StubApi::ok(fresh()), "2026-03-10T18:01:00Z");
        assert_eq!(client.fetch(), cached());
        assert_eq!(client.api.calls.get(), 0);
    }

    #[test]
    fn test_stale_cache_is_refreshed() {
        let dir = config_dir(true);
        seed_cache(&dir, "2026-03-10T18:00:00Z");

        let client = client(&dir, StubApi::ok(fresh()), "2026-03-10T18:02:00Z");
        assert_eq!(client.fetch(), fresh());
        assert_eq!(client.api.calls.get(), 1);

        let entry = client.cache.load().unwrap();
        assert_eq!(entry.snapshot, fresh());
        assert_eq!(entry.fetched_at, Some(at("2026-03-10T18:02:00Z")));
    }

    #[test]
    fn test_unreachable_endpoint_serves_stale_cache() {
        let dir = config_dir(true);
        seed_cache(&dir, "2026-03-10T10:00:00Z");

        let client = client(&dir, StubApi::unreachable(), "2026-03-10T18:00:00Z");
        assert_eq!(client.fetch(), cached());
        assert_eq!(client.api.calls.get(), 1);

        // Failure must not overwrite the last known-good snapshot
        let entry = client.cache.load().unwrap();
        assert_eq!(entry.fetched_at, Some(at("2026-03-10T10:00:00Z")));
    }

    #[test]
    fn test_unreachable_endpoint_without_cache_is_empty() {
        let dir = config_dir(true);
        let client = client(&dir, StubApi::unreachable(), "2026-03-10T18:00:00Z");
        assert!(client.fetch().is_empty());
        assert!(!dir.path().join(CACHE_FILE).exists());
    }

    #[test]
    fn test_missing_credentials_skip_request() {
        let dir = config_dir(false);
        seed_cache(&dir, "2026-03-10T10:00:00Z");

        let client = client(&dir, StubApi::ok(fresh()), "2026-03-10T18:00:00Z");
        assert_eq!(client.fetch(), cached());
        assert_eq!(client.api.calls.get(), 0);
        assert!(matches!(
            client.fetch_remote(),
            Err(FetchError::Credential(CredentialError::Missing { .. }))
        ));
    }

    #[test]
    fn test_corrupt_cache_and_failure_is_empty() {
        let dir = config_dir(true);
        fs::write(dir.path().join(CACHE_FILE), "garbage").unwrap();

        let client = client(&dir, StubApi::unreachable(), "2026-03-10T18:00:00Z");
        assert!(client.fetch().is_empty());
    }

    #[test]
    fn test_cache_write_failure_still_returns_snapshot() {
        let dir = config_dir(true);
        let client = UsageClient::new(
            CredentialProvider::in_dir(dir.path()),
            CacheStore::new(
                dir.path().join("no-such-dir").join(CACHE_FILE),
                FixedClock(at("2026-03-10T18:00:00Z")),
            ),
            StubApi::ok(fresh()),
            DEFAULT_CACHE_TTL,
        );
        assert_eq!(client.fetch(), fresh());
    }

    #[test]
    fn test_parse_usage_response() {
        let snapshot = parse_usage_response(
            r#"{"five_hour": {"utilization": 73.4, "resets_at": "2026-03-10T20:00:00+00:00"}, "seven_day": null}"#,
        )
        .unwrap();
        assert_eq!(snapshot.short_window.unwrap().percent(), 73.4);
        assert!(snapshot.long_window.is_none());

        assert!(matches!(
            parse_usage_response("<html>502 Bad Gateway</html>"),
            Err(FetchError::Response(ResponseError::Body(_)))
        ));
    }

    #[test]
    fn test_http_api_connection_refused_is_transport_error() {
        let api = HttpUsageApi::new("http://127.0.0.1:9/api/oauth/usage", Duration::from_secs(1));
        let result = api.fetch_usage(&AccessToken::new("tok"));
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }
}
