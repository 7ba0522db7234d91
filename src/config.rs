//! Pipeline configuration.
//!
//! Every knob has a stock default, so the pipeline runs without any file at
//! all. A TOML file may override any subset of keys:
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [cache]
//! capacity = 20             # Pixel cache entries per zoom mode before a full flush
//!
//! [thumbnails]
//! width = 500               # Bounding box of generated thumbnails
//! height = 120              # Also names the per-height cache directory
//! quality = 85              # JPEG quality (1-100)
//! # cache_root = "/home/me/.cache/glance/thumbs"
//!
//! [throttle]
//! idle_ms = 2000            # Required quiet time since the last interaction
//! poll_ms = 200             # Idle-wait polling interval
//! pause_ms = 20             # Fixed pause before each thumbnail
//! startup_grace_ms = 2000   # Longest the thumbnail worker waits at startup
//! startup_poll_ms = 100
//! ```
//!
//! User values are merged on top of the stock defaults, unknown keys are
//! rejected to catch typos early, and the merged result is validated.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub cache: CacheConfig,
    pub thumbnails: ThumbnailConfig,
    pub throttle: ThrottleConfig,
}

impl PipelineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.capacity == 0 {
            return Err(ConfigError::Validation(
                "cache.capacity must be at least 1".into(),
            ));
        }
        if self.thumbnails.width == 0 || self.thumbnails.height == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.width and thumbnails.height must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.thumbnails.quality) {
            return Err(ConfigError::Validation(
                "thumbnails.quality must be 1-100".into(),
            ));
        }
        Ok(())
    }
}

/// In-memory pixel cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Entries per zoom mode; reaching it flushes that mode's whole cache.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 20 }
    }
}

/// Persisted thumbnail settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailConfig {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    /// Root under which one directory per thumbnail height is created.
    pub cache_root: PathBuf,
}

impl ThumbnailConfig {
    /// Directory holding thumbnails of the configured height.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_root.join(self.height.to_string())
    }
}

fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("glance")
        .join("thumbs")
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            width: 500,
            height: 120,
            quality: 85,
            cache_root: default_cache_root(),
        }
    }
}

/// Timing of the thumbnail worker's idle throttle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThrottleConfig {
    pub idle_ms: u64,
    pub poll_ms: u64,
    pub pause_ms: u64,
    pub startup_grace_ms: u64,
    pub startup_poll_ms: u64,
}

impl ThrottleConfig {
    pub fn idle(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }

    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }

    pub fn startup_poll(&self) -> Duration {
        Duration::from_millis(self.startup_poll_ms)
    }

    /// No waiting at all. Used by tests and batch tools with no interactive user.
    pub fn disabled() -> Self {
        Self {
            idle_ms: 0,
            poll_ms: 1,
            pause_ms: 0,
            startup_grace_ms: 0,
            startup_poll_ms: 1,
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            idle_ms: 2000,
            poll_ms: 200,
            pause_ms: 20,
            startup_grace_ms: 2000,
            startup_poll_ms: 100,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(PipelineConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key-by-key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<PipelineConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PipelineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file. `None` yields the validated stock defaults.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    let overlay = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        }
        None => None,
    };
    resolve_config(overlay)
}

/// Returns a fully-commented stock config file. Used by `glance gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# Glance Configuration
# =====================
# All keys are optional. Values shown are the defaults.

[cache]
# In-memory decoded images kept per zoom mode (fit / full). When a batch of
# background preparation is about to add an entry to a full cache, that
# mode's cache is flushed entirely.
capacity = 20

[thumbnails]
# Bounding box of generated thumbnails, in pixels. Aspect ratio is preserved.
width = 500
height = 120
# JPEG quality of persisted thumbnails (1-100).
quality = 85
# Root directory for persisted thumbnails. One sub-directory per height.
# Defaults to <user cache dir>/glance/thumbs.
# cache_root = "/path/to/thumbs"

[throttle]
# The thumbnail worker only runs after this much quiet time since the last
# user interaction.
idle_ms = 2000
poll_ms = 200
# Fixed pause before each thumbnail.
pause_ms = 20
# At startup the thumbnail worker waits until the viewer leaves single-image
# mode, or at most this long.
startup_grace_ms = 2000
startup_poll_ms = 100
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.cache.capacity, 20);
        assert_eq!(config.thumbnails.width, 500);
        assert_eq!(config.thumbnails.height, 120);
        assert_eq!(config.throttle.idle(), Duration::from_secs(2));
        assert_eq!(config.throttle.pause(), Duration::from_millis(20));
    }

    #[test]
    fn cache_dir_is_keyed_by_height() {
        let mut config = ThumbnailConfig::default();
        config.cache_root = PathBuf::from("/tmp/thumbs");
        assert_eq!(config.cache_dir(), PathBuf::from("/tmp/thumbs/120"));
    }

    #[test]
    fn parse_partial_config() {
        let overlay: toml::Value = toml::from_str(
            r#"
[thumbnails]
height = 200
"#,
        )
        .unwrap();
        let config = resolve_config(Some(overlay)).unwrap();
        assert_eq!(config.thumbnails.height, 200);
        // Untouched defaults survive the merge
        assert_eq!(config.thumbnails.width, 500);
        assert_eq!(config.cache.capacity, 20);
    }

    #[test]
    fn unknown_keys_rejected() {
        let overlay: toml::Value = toml::from_str(
            r#"
[cache]
capacitty = 5
"#,
        )
        .unwrap();
        assert!(matches!(
            resolve_config(Some(overlay)),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn zero_capacity_fails_validation() {
        let overlay: toml::Value = toml::from_str("[cache]\ncapacity = 0\n").unwrap();
        assert!(matches!(
            resolve_config(Some(overlay)),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn quality_out_of_range_fails_validation() {
        let mut config = PipelineConfig::default();
        config.thumbnails.quality = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn merge_toml_overrides_nested_keys_only() {
        let base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"]["x"].as_integer(), Some(1));
        assert_eq!(merged["a"]["y"].as_integer(), Some(3));
    }

    #[test]
    fn load_config_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("glance.toml");
        fs::write(&path, "[throttle]\nidle_ms = 500\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.throttle.idle(), Duration::from_millis(500));
        assert_eq!(config.throttle.poll_ms, 200);
    }

    #[test]
    fn load_config_without_file_is_stock() {
        let config = load_config(None).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let overlay: toml::Value = toml::from_str(stock_config_toml()).unwrap();
        let config = resolve_config(Some(overlay)).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn disabled_throttle_never_waits() {
        let throttle = ThrottleConfig::disabled();
        assert_eq!(throttle.idle(), Duration::ZERO);
        assert_eq!(throttle.startup_grace(), Duration::ZERO);
    }
}
