//! Configuration for the FreeExperience data-access core.
//!
//! Sources are merged in priority order: built-in defaults, an optional
//! TOML file, then environment variables prefixed `FREEXP_` (nested keys
//! separated by `__`, e.g. `FREEXP_REMOTE__URL`). The embedding binary may
//! call [`load_env`] first to pick up a `.env` file.
//!
//! The loaded [`AppConfig`] answers the one question the dual-backend
//! abstraction needs: [`AppConfig::remote`] — is a remote persistence
//! service configured, and with what endpoint. The answer is computed once
//! at process start; the selected backend never changes at runtime.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default cache TTL in milliseconds.
const DEFAULT_TTL_MS: u64 = 30_000;

/// Error types for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

/// Remote persistence service settings as loaded (possibly incomplete).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteSettings {
    /// Base URL of the persistence service.
    pub url: Option<String>,
    /// Publishable API key sent with every request.
    pub anon_key: Option<String>,
}

/// Cache tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Time-to-live for cached reads, in milliseconds.
    pub ttl_ms: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_TTL_MS,
        }
    }
}

/// Validated remote endpoint, present only when the remote backend is
/// fully configured.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub url: Url,
    pub anon_key: String,
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub remote: RemoteSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

impl AppConfig {
    /// Loads configuration from the default file location (`freexp.toml`
    /// in the working directory, optional) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder(None).build()
    }

    /// Loads configuration from an explicit file plus the environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::builder(Some(path)).build()
    }

    fn builder(path: Option<&Path>) -> Loader<'_> {
        Loader { path }
    }

    /// The static availability check for the dual-backend abstraction:
    /// `Some` iff a URL and key are both present and the URL parses.
    pub fn remote(&self) -> Option<RemoteConfig> {
        let url = self.remote.url.as_deref().filter(|u| !u.is_empty())?;
        let anon_key = self.remote.anon_key.clone().filter(|k| !k.is_empty())?;
        match Url::parse(url) {
            Ok(url) => Some(RemoteConfig { url, anon_key }),
            Err(error) => {
                tracing::warn!(%error, "remote url is not parseable, ignoring remote settings");
                None
            }
        }
    }

    pub fn remote_configured(&self) -> bool {
        self.remote().is_some()
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache.ttl_ms)
    }
}

struct Loader<'a> {
    path: Option<&'a Path>,
}

impl Loader<'_> {
    fn build(self) -> Result<AppConfig, ConfigError> {
        let mut builder = config::Config::builder();
        builder = match self.path {
            Some(path) => builder.add_source(config::File::from(path)),
            None => builder.add_source(config::File::with_name("freexp").required(false)),
        };
        let settings = builder
            .add_source(
                config::Environment::with_prefix("FREEXP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

/// Loads a `.env` file if one exists. Intended for the embedding binary;
/// library code never calls this.
pub fn load_env() {
    let _ = dotenvy::dotenv();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_leave_remote_unconfigured() {
        let config = AppConfig::default();
        assert!(!config.remote_configured());
        assert_eq!(config.cache_ttl(), Duration::from_millis(30_000));
    }

    #[test]
    fn remote_requires_both_url_and_key() {
        let mut config = AppConfig::default();
        config.remote.url = Some("https://db.example.com".into());
        assert!(!config.remote_configured());

        config.remote.anon_key = Some("anon-key".into());
        assert!(config.remote_configured());
        assert_eq!(
            config.remote().unwrap().url.as_str(),
            "https://db.example.com/"
        );
    }

    #[test]
    fn unparseable_url_counts_as_unconfigured() {
        let mut config = AppConfig::default();
        config.remote.url = Some("not a url".into());
        config.remote.anon_key = Some("anon-key".into());
        assert!(!config.remote_configured());
    }

    #[test]
    fn loads_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[remote]\nurl = \"https://db.example.com\"\nanon_key = \"anon-key\"\n\n[cache]\nttl_ms = 5000"
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert!(config.remote_configured());
        assert_eq!(config.cache_ttl(), Duration::from_millis(5000));
    }
}
