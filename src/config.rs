use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default REST API root.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub pipeline: PipelineConfig,
  /// Directory for daily-rolling log files (logs go to stderr when unset)
  pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
    }
  }
}

fn default_base_url() -> String {
  DEFAULT_API_BASE.to_string()
}

/// Tuning knobs of the request pipeline, in file units (milliseconds).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// Minimum gap between dispatches (500ms = 2 requests/second)
  pub min_spacing_ms: u64,
  pub cache_ttl_ms: u64,
  /// Failed attempts allowed before a request is rejected
  pub max_retries: u32,
  /// Retry n waits `retry_base_delay_ms * n`
  pub retry_base_delay_ms: u64,
  pub default_message_limit: u32,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      min_spacing_ms: 500,
      cache_ttl_ms: 60_000,
      max_retries: 3,
      retry_base_delay_ms: 1000,
      default_message_limit: 30,
    }
  }
}

/// Resolved settings consumed by [`ApiClient`](crate::ApiClient).
#[derive(Debug, Clone)]
pub struct Settings {
  pub base_url: String,
  pub min_spacing: Duration,
  pub cache_ttl: Duration,
  pub max_retries: u32,
  pub retry_base_delay: Duration,
  pub default_message_limit: u32,
}

impl Default for Settings {
  fn default() -> Self {
    Config::default().settings()
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./cordq.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/cordq/config.yaml
  ///
  /// Without any file the defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("cordq.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("cordq").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    // An empty document deserializes as unit, not as an empty mapping
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Convert file units into pipeline settings.
  pub fn settings(&self) -> Settings {
    let p = &self.pipeline;
    Settings {
      base_url: self.api.base_url.trim_end_matches('/').to_string(),
      min_spacing: Duration::from_millis(p.min_spacing_ms),
      cache_ttl: Duration::from_millis(p.cache_ttl_ms),
      max_retries: p.max_retries,
      retry_base_delay: Duration::from_millis(p.retry_base_delay_ms),
      default_message_limit: p.default_message_limit,
    }
  }

  /// Get the API token from environment variables.
  ///
  /// Checks CORDQ_TOKEN first, then DISCORD_TOKEN as fallback.
  pub fn get_token() -> Result<String> {
    std::env::var("CORDQ_TOKEN")
      .or_else(|_| std::env::var("DISCORD_TOKEN"))
      .map_err(|_| {
        eyre!("API token not found. Set CORDQ_TOKEN or DISCORD_TOKEN environment variable.")
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let settings = Settings::default();

    assert_eq!(settings.base_url, DEFAULT_API_BASE);
    assert_eq!(settings.min_spacing, Duration::from_millis(500));
    assert_eq!(settings.cache_ttl, Duration::from_secs(60));
    assert_eq!(settings.max_retries, 3);
    assert_eq!(settings.retry_base_delay, Duration::from_secs(1));
    assert_eq!(settings.default_message_limit, 30);
  }

  #[test]
  fn test_partial_yaml_keeps_defaults() {
    let config = Config::from_yaml(
      "api:\n  base_url: http://localhost:8080/api/\npipeline:\n  cache_ttl_ms: 100\n",
    )
    .unwrap();
    let settings = config.settings();

    assert_eq!(settings.base_url, "http://localhost:8080/api");
    assert_eq!(settings.cache_ttl, Duration::from_millis(100));
    assert_eq!(settings.max_retries, 3);
    assert!(config.log_dir.is_none());
  }

  #[test]
  fn test_empty_yaml_is_default() {
    let config = Config::from_yaml("").unwrap();
    assert_eq!(config.settings().min_spacing, Duration::from_millis(500));
  }

  #[test]
  fn test_invalid_yaml_is_error() {
    assert!(Config::from_yaml("pipeline: [1, 2").is_err());
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    let err = Config::load(Some(Path::new("/nonexistent/cordq.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
