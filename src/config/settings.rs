use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use usageline_core::usage::{DEFAULT_CACHE_TTL, DEFAULT_TIMEOUT, USAGE_ENDPOINT};

/// Command line arguments
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Claude usage limits as a compact status line")]
pub struct Config {
    /// Claude config directory containing .credentials.json (e.g. ~/.claude)
    pub config_dir: Option<PathBuf>,

    /// Enable debug logging (stderr)
    #[arg(short, long)]
    pub debug: bool,

    /// Path to settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Seconds a cached snapshot is trusted before re-fetching
    #[arg(long)]
    pub ttl: Option<u64>,

    /// Fixed UTC offset in minutes used for reset times (default -360)
    #[arg(long, allow_negative_numbers = true)]
    pub utc_offset: Option<i32>,
}

impl Config {
    /// Parse command line arguments.
    ///
    /// `--help` and `--version` exit as usual; any other parse error is
    /// logged and the defaults are used so the status line still renders.
    pub fn parse_args() -> Self {
        Self::try_parse().unwrap_or_else(|e| {
            if !e.use_stderr() {
                e.exit();
            }
            eprintln!("{}", e);
            Self::default()
        })
    }

    /// Directory holding the credential and cache files.
    ///
    /// Without an argument this falls back to the executable's own
    /// directory, which is only correct if it was installed there.
    pub fn resolve_config_dir(&self) -> PathBuf {
        if let Some(dir) = &self.config_dir {
            return expand_tilde(dir);
        }

        let fallback = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        warn!(
            "No config directory given, falling back to {}",
            fallback.display()
        );
        fallback
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) if rest.as_os_str().is_empty() => home,
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// Application settings (from config file)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Cache TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Civil timezone for reset times, minutes east of UTC
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,

    /// Usage request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Usage endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_cache_ttl() -> u64 {
    DEFAULT_CACHE_TTL.as_secs()
}

fn default_utc_offset() -> i32 {
    usageline_core::render::DEFAULT_UTC_OFFSET_MINUTES
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_endpoint() -> String {
    USAGE_ENDPOINT.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl(),
            utc_offset_minutes: default_utc_offset(),
            timeout_secs: default_timeout(),
            endpoint: default_endpoint(),
        }
    }
}

impl Settings {
    /// Load settings from file or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        // Try custom path first
        if let Some(p) = path {
            if p.exists() {
                return Self::read_file(p);
            }
            warn!("Settings file not found: {:?}", p);
        }

        // Try default config locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("usageline/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/usageline/config.toml")),
            dirs::home_dir().map(|p| p.join(".usageline.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::read_file(path);
            }
        }

        Ok(Self::default())
    }

    fn read_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Merge CLI config into settings (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: &Config) {
        if let Some(ttl) = cli.ttl {
            self.cache_ttl_secs = ttl;
        }
        if let Some(offset) = cli.utc_offset {
            self.utc_offset_minutes = offset;
        }
    }

    /// Validate and normalize settings values
    ///
    /// A zero timeout would disable the bound on the request, and offsets
    /// must stay strictly within a day.
    pub fn validate(&mut self) {
        const MAX_OFFSET_MINUTES: i32 = 24 * 60;

        if self.timeout_secs == 0 {
            warn!("timeout_secs must be positive, using default");
            self.timeout_secs = default_timeout();
        }
        if self.utc_offset_minutes.abs() >= MAX_OFFSET_MINUTES {
            warn!(
                "utc_offset_minutes {} out of range, using default",
                self.utc_offset_minutes
            );
            self.utc_offset_minutes = default_utc_offset();
        }
        if self.endpoint.trim().is_empty() {
            self.endpoint = default_endpoint();
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.cache_ttl_secs, 120);
        assert_eq!(settings.utc_offset_minutes, -360);
        assert_eq!(settings.timeout(), Duration::from_secs(5));
        assert_eq!(settings.endpoint, "https://api.anthropic.com/api/oauth/usage");
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            cache_ttl_secs = 60
            utc_offset_minutes = 540
        "#;

        let settings: Settings = toml::from_str(toml).expect("Should parse TOML");
        assert_eq!(settings.cache_ttl(), Duration::from_secs(60));
        assert_eq!(settings.utc_offset_minutes, 540);
        assert_eq!(settings.timeout_secs, 5);
    }

    #[test]
    fn test_load_custom_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usageline.toml");
        std::fs::write(&path, "timeout_secs = 2\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.timeout_secs, 2);

        std::fs::write(&path, "timeout_secs = \"soon\"\n").unwrap();
        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn test_merge_cli_and_validate() {
        let cli = Config::parse_from(["usageline", "~/.claude", "--ttl", "30", "--utc-offset", "-300"]);
        let mut settings = Settings::default();
        settings.merge_cli(&cli);
        assert_eq!(settings.cache_ttl_secs, 30);
        assert_eq!(settings.utc_offset_minutes, -300);

        settings.utc_offset_minutes = 1440;
        settings.timeout_secs = 0;
        settings.validate();
        assert_eq!(settings.utc_offset_minutes, -360);
        assert_eq!(settings.timeout_secs, 5);
    }

    #[test]
    fn test_expand_tilde() {
        temp_env::with_var("HOME", Some("/home/tester"), || {
            assert_eq!(
                expand_tilde(Path::new("~/.claude")),
                PathBuf::from("/home/tester/.claude")
            );
            assert_eq!(expand_tilde(Path::new("~")), PathBuf::from("/home/tester"));
        });
        assert_eq!(
            expand_tilde(Path::new("/opt/claude")),
            PathBuf::from("/opt/claude")
        );
        assert_eq!(expand_tilde(Path::new("~other/x")), PathBuf::from("~other/x"));
    }

    #[test]
    fn test_resolve_config_dir() {
        let cli = Config::parse_from(["usageline", "/opt/claude"]);
        assert_eq!(cli.resolve_config_dir(), PathBuf::from("/opt/claude"));

        let cli = Config::parse_from(["usageline"]);
        assert!(cli.resolve_config_dir().is_absolute());
    }
}
