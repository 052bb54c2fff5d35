//! Seatwatch configuration loading
//!
//! Loads configuration from `~/.config/seatwatch/seatwatch.toml` (or the
//! `SEATWATCH_CONFIG` env var). A missing file yields defaults.

use crate::errors::{Result, SeatwatchError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SeatwatchConfig {
    /// Path to the officeholder SQLite database
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Live overlay source settings
    #[serde(default)]
    pub live: LiveConfig,

    /// Overlay cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Composition bar settings
    #[serde(default)]
    pub render: RenderConfig,
}

fn default_db_path() -> String {
    dirs::home_dir()
        .map(|h| {
            h.join(".config")
                .join("seatwatch")
                .join("officeholders.db")
                .to_string_lossy()
                .into_owned()
        })
        .unwrap_or_else(|| "officeholders.db".to_string())
}

/// Live election source configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LiveConfig {
    /// Master switch for the live overlay
    #[serde(default = "default_live_enabled")]
    pub enabled: bool,

    /// REST base URL (e.g. `https://<project>.supabase.co`)
    #[serde(default)]
    pub base_url: String,

    /// Anonymous read key; `SEATWATCH_LIVE_API_KEY` takes precedence
    #[serde(default)]
    pub api_key: String,

    /// The only election year the overlay ever represents
    #[serde(default = "default_cycle_year")]
    pub cycle_year: i32,

    /// Hard bound on one batched live query
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_live_enabled() -> bool {
    true
}
fn default_cycle_year() -> i32 {
    2026
}
fn default_timeout_ms() -> u64 {
    8_000
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            enabled: default_live_enabled(),
            base_url: String::new(),
            api_key: String::new(),
            cycle_year: default_cycle_year(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl LiveConfig {
    pub const ENV_API_KEY: &'static str = "SEATWATCH_LIVE_API_KEY";

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// API key from the environment, falling back to the config file value
    pub fn resolved_api_key(&self) -> String {
        std::env::var(Self::ENV_API_KEY)
            .ok()
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| self.api_key.clone())
    }
}

/// Overlay cache configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Entries at or past this age are treated as absent
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Session cache file; `None` keeps the cache in memory
    #[serde(default)]
    pub db_path: Option<String>,
}

fn default_ttl_secs() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            db_path: None,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Composition bar configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    #[serde(default = "default_bar_width")]
    pub bar_width: f64,

    #[serde(default = "default_bar_height")]
    pub bar_height: f64,

    /// Segments at or below this pixel width get no label
    #[serde(default = "default_label_min_width")]
    pub label_min_width: f64,
}

fn default_bar_width() -> f64 {
    600.0
}
fn default_bar_height() -> f64 {
    32.0
}
fn default_label_min_width() -> f64 {
    28.0
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            bar_width: default_bar_width(),
            bar_height: default_bar_height(),
            label_min_width: default_label_min_width(),
        }
    }
}

impl Default for SeatwatchConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            live: LiveConfig::default(),
            cache: CacheConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl SeatwatchConfig {
    pub const ENV_CONFIG_PATH: &'static str = "SEATWATCH_CONFIG";
    pub const DEFAULT_CONFIG_FILENAME: &'static str = "seatwatch.toml";

    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> Result<Self> {
        let path = Self::resolve_config_path();

        if !path.exists() {
            tracing::debug!(
                path = %path.display(),
                "seatwatch config not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load_from_path(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SeatwatchError::config_with_source(
                format!("failed to read config at {}", path.display()),
                e,
            )
        })?;

        Self::parse(&contents)
    }

    /// Parse configuration from TOML string
    pub fn parse(contents: &str) -> Result<Self> {
        let cfg: SeatwatchConfig = toml::from_str(contents)
            .map_err(|e| SeatwatchError::config_with_source("failed to parse config", e))?;

        cfg.validate()?;
        Ok(cfg)
    }

    fn resolve_config_path() -> PathBuf {
        if let Ok(path) = std::env::var(Self::ENV_CONFIG_PATH) {
            return PathBuf::from(path);
        }

        dirs::home_dir()
            .map(|h| {
                h.join(".config")
                    .join("seatwatch")
                    .join(Self::DEFAULT_CONFIG_FILENAME)
            })
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_CONFIG_FILENAME))
    }

    fn validate(&self) -> Result<()> {
        if self.cache.ttl_secs == 0 {
            return Err(SeatwatchError::config("cache.ttl_secs must be positive"));
        }

        if self.live.timeout_ms == 0 {
            return Err(SeatwatchError::config("live.timeout_ms must be positive"));
        }

        if self.render.bar_width <= 0.0 {
            return Err(SeatwatchError::config("render.bar_width must be positive"));
        }

        if self.live.enabled && self.live.base_url.is_empty() {
            tracing::warn!("live overlay enabled but live.base_url is empty; overlay will degrade");
        }

        Ok(())
    }

    /// Get the resolved database path (expanding ~ if needed)
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_home(&self.db_path)
    }

    /// Resolved session cache path, if a file-backed cache is configured
    pub fn resolved_cache_path(&self) -> Option<PathBuf> {
        self.cache.db_path.as_deref().map(expand_home)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    PathBuf::from(path)
}
