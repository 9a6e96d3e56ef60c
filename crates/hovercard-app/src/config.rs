//! Configuration file loading and validation.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::cache::{DEFAULT_CAPACITY, DEFAULT_TTL};
use crate::hover::HoverTimings;
use crate::rate_limit::DEFAULT_MIN_GAP;

const CONFIG_DIR: &str = "hovercard";
const CONFIG_FILE: &str = "config.toml";

/// Top-level configuration loaded from `<config dir>/hovercard/config.toml`.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct HovercardConfig {
    /// Profile API endpoint.
    #[serde(default)]
    pub api: ApiConfig,
    /// Profile cache bounds.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Spacing between outbound requests.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Hover timer delays.
    #[serde(default)]
    pub hover: HoverConfig,
}

impl HovercardConfig {
    /// Default location of the configuration file, when a config dir exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load configuration from `explicit`, or from the default location.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read, parsed, or validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_path(path),
            None => Self::default_path().map_or_else(|| Ok(Self::default()), Self::from_path),
        }
    }

    /// Load configuration from a known file path. A missing file yields defaults.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read, parsed, or validated.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("failed to load {}", path.display()))
    }

    /// Parse and validate configuration from TOML text.
    ///
    /// # Errors
    /// Returns an error when the text is not valid TOML or fails validation.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints; used again after CLI overrides.
    ///
    /// # Errors
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        self.api.validate()?;
        self.cache.validate()?;
        self.hover.validate()
    }
}

/// `[api]` block.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    /// Scheme and host of the forum API.
    pub base_url: String,
    /// Path of the user-info endpoint, starting with `/`.
    pub user_info_path: String,
    /// HTTP request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".into(),
            user_info_path: "/api/users/info".into(),
            timeout_ms: 10_000,
        }
    }
}

impl ApiConfig {
    /// HTTP client timeout.
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        let base = self.base_url.trim();
        if base.is_empty() {
            bail!("api.base_url must not be empty");
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            bail!("api.base_url '{base}' must use http or https");
        }
        if !self.user_info_path.starts_with('/') {
            bail!("api.user_info_path '{}' must start with '/'", self.user_info_path);
        }
        Ok(())
    }
}

/// `[cache]` block.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry time-to-live in milliseconds.
    pub ttl_ms: u64,
    /// Maximum number of cached profiles.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: millis(DEFAULT_TTL),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl CacheConfig {
    /// Entry time-to-live.
    pub const fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.ttl_ms == 0 {
            bail!("cache.ttl_ms must be greater than zero");
        }
        if self.capacity == 0 {
            bail!("cache.capacity must be greater than zero");
        }
        Ok(())
    }
}

/// `[rate_limit]` block.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Minimum milliseconds between two dispatches.
    pub min_gap_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_gap_ms: millis(DEFAULT_MIN_GAP),
        }
    }
}

impl RateLimitConfig {
    /// Minimum gap between dispatches.
    pub const fn min_gap(&self) -> Duration {
        Duration::from_millis(self.min_gap_ms)
    }
}

/// `[hover]` block.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HoverConfig {
    /// Rest time on a name before the card is fetched.
    pub show_delay_ms: u64,
    /// Grace period after the pointer leaves the name or card.
    pub hide_delay_ms: u64,
    /// Default delay of a soft hide request.
    pub soft_hide_delay_ms: u64,
    /// Idle card lifetime.
    pub auto_hide_ms: u64,
}

impl Default for HoverConfig {
    fn default() -> Self {
        let timings = HoverTimings::default();
        Self {
            show_delay_ms: millis(timings.show_delay),
            hide_delay_ms: millis(timings.hide_delay),
            soft_hide_delay_ms: millis(timings.soft_hide_delay),
            auto_hide_ms: millis(timings.auto_hide),
        }
    }
}

impl HoverConfig {
    /// Controller timings described by this block.
    pub const fn timings(&self) -> HoverTimings {
        HoverTimings {
            show_delay: Duration::from_millis(self.show_delay_ms),
            hide_delay: Duration::from_millis(self.hide_delay_ms),
            soft_hide_delay: Duration::from_millis(self.soft_hide_delay_ms),
            auto_hide: Duration::from_millis(self.auto_hide_ms),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.hide_delay_ms > self.soft_hide_delay_ms {
            bail!(
                "hover.hide_delay_ms ({}) must not exceed hover.soft_hide_delay_ms ({})",
                self.hide_delay_ms,
                self.soft_hide_delay_ms
            );
        }
        Ok(())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
