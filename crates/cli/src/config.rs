use anyhow::{Context, Result, bail};
use clubhouse_backend::RestBackend;
use clubhouse_runtime_config::{CONFIG_FILE_NAME, ClubConfig};
use std::path::PathBuf;

/// Get the config directory path (~/.config/clubhouse/)
pub fn config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home).join(".config").join("clubhouse"))
}

/// Config file path; `CLUBHOUSE_CONFIG` wins over the canonical location.
pub fn config_path() -> Result<PathBuf> {
    match std::env::var("CLUBHOUSE_CONFIG") {
        Ok(path) if !path.trim().is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(config_dir()?.join(CONFIG_FILE_NAME)),
    }
}

fn load_file() -> Result<ClubConfig> {
    let path = config_path()?;
    ClubConfig::load(&path).with_context(|| format!("Failed to read config at {}", path.display()))
}

/// Load config from disk plus environment overrides, returning defaults if not found.
pub fn load_config() -> Result<ClubConfig> {
    let mut config = load_file()?;
    config.apply_env();
    Ok(config)
}

/// Client for the hosted backend described by `config`.
pub fn connect(config: &ClubConfig) -> Result<RestBackend> {
    if !config.backend.is_configured() {
        bail!(
            "backend not configured. Run `clubhouse config --backend-url <url> --anon-key <key>` \
             or set CLUBHOUSE_BACKEND_URL and CLUBHOUSE_ANON_KEY"
        );
    }
    tracing::debug!(url = %config.backend.url, "connecting to backend");
    RestBackend::new(
        &config.backend.url,
        &config.backend.anon_key,
        config.backend.timeout(),
    )
    .context("Failed to build backend client")
}

fn mask(key: &str) -> String {
    if key.is_empty() {
        "(not set)".to_string()
    } else {
        let shown: String = key.chars().take(8).collect();
        format!("{shown}...")
    }
}

/// Print current config.
pub fn show_config() -> Result<()> {
    let config = load_config()?;
    let path = config_path()?;
    println!("Config file: {}", path.display());
    println!();
    println!("[backend]");
    println!(
        "  url      = {}",
        if config.backend.url.is_empty() {
            "(not set)"
        } else {
            config.backend.url.as_str()
        }
    );
    println!("  anon_key = {}", mask(&config.backend.anon_key));
    println!("  timeout  = {}s", config.backend.timeout_secs);
    println!();
    println!("[site]");
    println!("  base_url = {}", config.site.base_url);
    Ok(())
}

/// Update config with provided values. Environment overrides are not persisted.
pub fn set_config(
    backend_url: Option<String>,
    anon_key: Option<String>,
    site_url: Option<String>,
) -> Result<()> {
    let mut config = load_file()?;

    if let Some(url) = backend_url {
        config.backend.url = url.trim_end_matches('/').to_string();
    }
    if let Some(key) = anon_key {
        config.backend.anon_key = key;
    }
    if let Some(url) = site_url {
        config.site.base_url = url.trim_end_matches('/').to_string();
    }

    let path = config_path()?;
    config
        .save(&path)
        .with_context(|| format!("Failed to write config at {}", path.display()))?;
    println!("Configuration updated.");
    show_config()
}
