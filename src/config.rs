use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::storage::DEFAULT_USER_KEY;
use crate::transport::http::USER_AGENT;

// ---------------------------------------------------------------------------
// Environment override tracking
// ---------------------------------------------------------------------------

/// Tracks which settings were taken from `BUDDY_*` environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    overrides: HashMap<String, String>,
}

impl EnvOverrides {
    /// Check whether a setting key (e.g. "api.base_url") is overridden by an env var.
    pub fn is_overridden(&self, key: &str) -> bool {
        self.overrides.contains_key(key)
    }

    /// Get the env var name that overrides the given setting key.
    pub fn env_var_for(&self, key: &str) -> Option<&str> {
        self.overrides.get(key).map(String::as_str)
    }

    pub fn all(&self) -> &HashMap<String, String> {
        &self.overrides
    }

    fn record(&mut self, key: &str, env_var: &str) {
        self.overrides.insert(key.to_string(), env_var.to_string());
    }
}

// ---------------------------------------------------------------------------
// Config sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(skip)]
    pub env_overrides: EnvOverrides,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Backend root. Required; there is no sensible default.
    #[serde(default)]
    pub base_url: String,
    /// Uniform per-request timeout, refresh call included.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Where the logged-in user is persisted between runs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// `false` runs without a medium: nothing is restored or persisted.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_storage_key")]
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_storage_dir(),
            key: default_storage_key(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_timeout_secs() -> u64 {
    30
}
const fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_user_agent() -> String {
    USER_AGENT.to_string()
}
const fn default_true() -> bool {
    true
}
fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("buddy")
}
fn default_storage_key() -> String {
    DEFAULT_USER_KEY.to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

// ---------------------------------------------------------------------------
// Loading, env overrides, validation
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a TOML file, apply `BUDDY_*` environment
    /// overrides, and validate the result. A missing file means defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            config
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Config for `base_url` with every other setting at its default.
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.api.base_url = base_url.into();
        config
    }

    fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from `lookup` (normally the process environment).
    fn apply_env_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let mut ov = EnvOverrides::default();

        macro_rules! env_str {
            ($key:expr, $env:expr, $field:expr) => {
                if let Some(val) = lookup($env) {
                    $field = val;
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_bool {
            ($key:expr, $env:expr, $field:expr) => {
                if let Some(val) = lookup($env) {
                    $field = matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_parse {
            ($key:expr, $env:expr, $field:expr) => {
                if let Some(val) = lookup($env) {
                    if let Ok(parsed) = val.parse() {
                        $field = parsed;
                        ov.record($key, $env);
                    }
                }
            };
        }
        macro_rules! env_path {
            ($key:expr, $env:expr, $field:expr) => {
                if let Some(val) = lookup($env) {
                    $field = PathBuf::from(val);
                    ov.record($key, $env);
                }
            };
        }

        // -- API --
        env_str!("api.base_url", "BUDDY_API_URL", self.api.base_url);
        env_parse!("api.timeout_secs", "BUDDY_API_TIMEOUT_SECS", self.api.timeout_secs);
        env_parse!(
            "api.connect_timeout_secs",
            "BUDDY_API_CONNECT_TIMEOUT_SECS",
            self.api.connect_timeout_secs
        );
        env_str!("api.user_agent", "BUDDY_API_USER_AGENT", self.api.user_agent);

        // -- Storage --
        env_bool!("storage.enabled", "BUDDY_STORAGE_ENABLED", self.storage.enabled);
        env_path!("storage.dir", "BUDDY_STORAGE_DIR", self.storage.dir);
        env_str!("storage.key", "BUDDY_STORAGE_KEY", self.storage.key);

        // -- Logging --
        env_str!("logging.level", "BUDDY_LOG_LEVEL", self.logging.level);
        env_bool!("logging.json", "BUDDY_LOG_JSON", self.logging.json);

        self.env_overrides = ov;
    }

    /// Reject configurations the client cannot start with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            anyhow::bail!(
                "api.base_url is not configured. Set it in the config file or via BUDDY_API_URL."
            );
        }
        let parsed = url::Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("api.base_url '{base_url}' is not a valid URL: {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("api.base_url must be an http(s) URL, got '{base_url}'");
        }
        if self.api.timeout_secs == 0 {
            anyhow::bail!("api.timeout_secs must be positive");
        }
        if self.storage.enabled && self.storage.key.trim().is_empty() {
            anyhow::bail!("storage.key must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.api.connect_timeout_secs, 10);
        assert!(config.api.user_agent.starts_with("buddy-client/"));
        assert!(config.storage.enabled);
        assert_eq!(config.storage.key, "buddy_user");
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_missing_base_url_names_env_var() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("BUDDY_API_URL"));

        let err = Config::for_base_url("   ").validate().unwrap_err();
        assert!(err.to_string().contains("BUDDY_API_URL"));
    }

    #[test]
    fn test_base_url_must_be_http() {
        assert!(Config::for_base_url("https://api.buddy.org").validate().is_ok());
        assert!(Config::for_base_url("http://localhost:8080").validate().is_ok());
        assert!(Config::for_base_url("ftp://api.buddy.org").validate().is_err());
        assert!(Config::for_base_url("not a url").validate().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let config: Config = toml::from_str(
            r#"
            [api]
            base_url = "https://api.buddy.org"
            timeout_secs = 5

            [storage]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://api.buddy.org");
        assert_eq!(config.api.timeout(), Duration::from_secs(5));
        assert_eq!(config.api.connect_timeout_secs, 10);
        assert!(!config.storage.enabled);
        assert_eq!(config.storage.key, "buddy_user");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::for_base_url("https://file.example");
        config.apply_env_overrides_from(env(&[
            ("BUDDY_API_URL", "https://env.example"),
            ("BUDDY_API_TIMEOUT_SECS", "7"),
            ("BUDDY_STORAGE_ENABLED", "no"),
            ("BUDDY_STORAGE_DIR", "/tmp/buddy"),
            ("BUDDY_LOG_JSON", "1"),
        ]));

        assert_eq!(config.api.base_url, "https://env.example");
        assert_eq!(config.api.timeout_secs, 7);
        assert!(!config.storage.enabled);
        assert_eq!(config.storage.dir, PathBuf::from("/tmp/buddy"));
        assert!(config.logging.json);
        assert!(config.env_overrides.is_overridden("api.base_url"));
        assert_eq!(
            config.env_overrides.env_var_for("storage.dir"),
            Some("BUDDY_STORAGE_DIR")
        );
        assert!(!config.env_overrides.is_overridden("logging.level"));
    }

    #[test]
    fn test_unparseable_env_value_is_ignored() {
        let mut config = Config::default();
        config.apply_env_overrides_from(env(&[("BUDDY_API_TIMEOUT_SECS", "soon")]));
        assert_eq!(config.api.timeout_secs, 30);
        assert!(!config.env_overrides.is_overridden("api.timeout_secs"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults_then_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        // Without BUDDY_API_URL set this fails validation; with it, it loads.
        match std::env::var("BUDDY_API_URL") {
            Ok(_) => assert!(Config::load(&path).is_ok()),
            Err(_) => assert!(Config::load(&path).is_err()),
        }
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buddy.toml");
        std::fs::write(&path, "[api]\nbase_url = \"https://api.buddy.org\"\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert!(!config.api.base_url.is_empty());
    }
}
