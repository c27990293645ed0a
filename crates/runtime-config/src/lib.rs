//! Shared server/CLI configuration types.
//!
//! Both `clubhouse-server` and the `clubhouse` CLI read `clubhouse.toml`
//! through these types and then layer environment overrides on top.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Canonical config file name used by server/cli.
pub const CONFIG_FILE_NAME: &str = "clubhouse.toml";

pub const ENV_BACKEND_URL: &str = "CLUBHOUSE_BACKEND_URL";
pub const ENV_ANON_KEY: &str = "CLUBHOUSE_ANON_KEY";
pub const ENV_SITE_URL: &str = "BASE_URL";

/// Top-level configuration (persisted as `clubhouse.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ClubConfig {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub site: SiteSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendSettings {
    /// Project URL of the hosted backend, e.g. `https://xyz.supabase.co`.
    #[serde(default)]
    pub url: String,
    /// Public anon key sent as `apikey` on every request.
    #[serde(default)]
    pub anon_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BackendSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.anon_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteSettings {
    /// Public origin of the site; recovery links land on `<base_url>/reset-password`.
    #[serde(default = "default_site_url")]
    pub base_url: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            base_url: default_site_url(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_site_url() -> String {
    "http://localhost:3000".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config encode: {0}")]
    Encode(#[from] toml::ser::Error),
}

impl ClubConfig {
    /// Read `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Io(e)),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        let vars: HashMap<String, String> = [ENV_BACKEND_URL, ENV_ANON_KEY, ENV_SITE_URL]
            .into_iter()
            .filter_map(|k| std::env::var(k).ok().map(|v| (k.to_string(), v)))
            .collect();
        self.apply_overrides(&vars);
    }

    /// Apply overrides from an explicit variable map. Blank values are ignored.
    pub fn apply_overrides(&mut self, vars: &HashMap<String, String>) {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        if let Some(url) = get(ENV_BACKEND_URL) {
            self.backend.url = url;
        }
        if let Some(key) = get(ENV_ANON_KEY) {
            self.backend.anon_key = key;
        }
        if let Some(base) = get(ENV_SITE_URL) {
            self.site.base_url = base;
        }
    }
}
