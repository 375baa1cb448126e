use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::http::{CurlOptions, DEFAULT_MAX_RESPONSE_BYTES};
use crate::retry::Policy;

/// Retry policy parameters (`[retry]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retries after the first attempt.
    pub retry_max: u32,
    /// Lower backoff bound in seconds (e.g. 0.25 = 250ms).
    pub wait_min_secs: f64,
    /// Upper backoff bound in seconds.
    pub wait_max_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_max: 4,
            wait_min_secs: 1.0,
            wait_max_secs: 30.0,
        }
    }
}

impl RetryConfig {
    /// Backoff bounds as durations. Fails on negative or non-finite values and
    /// when min exceeds max.
    pub fn wait_bounds(&self) -> Result<(Duration, Duration)> {
        let min = secs("wait_min_secs", self.wait_min_secs)?;
        let max = secs("wait_max_secs", self.wait_max_secs)?;
        if min > max {
            bail!(
                "wait_min_secs ({}) must not exceed wait_max_secs ({})",
                self.wait_min_secs,
                self.wait_max_secs
            );
        }
        Ok((min, max))
    }

    /// Policy with these bounds and budget, default predicate and backoff.
    pub fn to_policy<T, E>(&self) -> Result<Policy<T, E>> {
        let (min, max) = self.wait_bounds()?;
        Ok(Policy::new().with_retry_max(self.retry_max).with_wait(min, max))
    }
}

/// Transport parameters (`[http]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    pub connect_timeout_secs: f64,
    pub timeout_secs: f64,
    pub follow_redirects: bool,
    pub max_redirections: u32,
    /// Largest response body kept in memory; missing in older files.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: u64,
}

fn default_max_response_bytes() -> u64 {
    DEFAULT_MAX_RESPONSE_BYTES
}

impl Default for HttpConfig {
    fn default() -> Self {
        let o = CurlOptions::default();
        Self {
            connect_timeout_secs: o.connect_timeout.as_secs_f64(),
            timeout_secs: o.timeout.as_secs_f64(),
            follow_redirects: o.follow_redirects,
            max_redirections: o.max_redirections,
            max_response_bytes: o.max_response_bytes,
        }
    }
}

impl HttpConfig {
    pub fn to_curl_options(&self) -> Result<CurlOptions> {
        Ok(CurlOptions {
            connect_timeout: secs("connect_timeout_secs", self.connect_timeout_secs)?,
            timeout: secs("timeout_secs", self.timeout_secs)?,
            follow_redirects: self.follow_redirects,
            max_redirections: self.max_redirections,
            max_response_bytes: self.max_response_bytes,
        })
    }
}

/// Global configuration loaded from `~/.config/resilient/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResilientConfig {
    /// Optional retry section; built-in defaults when missing.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    /// Optional transport section; built-in defaults when missing.
    #[serde(default)]
    pub http: Option<HttpConfig>,
}

impl Default for ResilientConfig {
    fn default() -> Self {
        Self {
            retry: Some(RetryConfig::default()),
            http: Some(HttpConfig::default()),
        }
    }
}

impl ResilientConfig {
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn retry(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    pub fn http(&self) -> HttpConfig {
        self.http.clone().unwrap_or_default()
    }
}

fn secs(field: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .with_context(|| format!("{} must be a non-negative number of seconds, got {}", field, value))
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("resilient")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from the XDG config dir, creating a default file if none exists.
pub fn load_or_init() -> Result<ResilientConfig> {
    load_or_init_at(&config_path()?)
}

/// Load configuration from `path`, creating it with defaults if it does not exist.
pub fn load_or_init_at(path: &Path) -> Result<ResilientConfig> {
    if !path.exists() {
        let default_cfg = ResilientConfig::default();
        let toml = default_cfg.to_toml()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)
            .with_context(|| format!("writing default config to {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: ResilientConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_values() {
        let cfg = ResilientConfig::default();
        let retry = cfg.retry();
        assert_eq!(retry.retry_max, 4);
        assert_eq!(retry.wait_min_secs, 1.0);
        assert_eq!(retry.wait_max_secs, 30.0);
        let http = cfg.http();
        assert_eq!(http.max_redirections, 10);
        assert!(http.follow_redirects);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = ResilientConfig::default();
        let toml = cfg.to_toml().unwrap();
        let parsed: ResilientConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_sections_optional() {
        let cfg: ResilientConfig = toml::from_str("").unwrap();
        assert!(cfg.retry.is_none());
        assert!(cfg.http.is_none());
        assert_eq!(cfg.retry(), RetryConfig::default());
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            [retry]
            retry_max = 3
            wait_min_secs = 0.5
            wait_max_secs = 15

            [http]
            connect_timeout_secs = 2
            timeout_secs = 10.5
            follow_redirects = false
            max_redirections = 3
            max_response_bytes = 1048576
        "#;
        let cfg: ResilientConfig = toml::from_str(toml).unwrap();
        let retry = cfg.retry.as_ref().unwrap();
        assert_eq!(retry.retry_max, 3);
        assert!((retry.wait_min_secs - 0.5).abs() < 1e-9);
        let (min, max) = retry.wait_bounds().unwrap();
        assert_eq!(min, Duration::from_millis(500));
        assert_eq!(max, Duration::from_secs(15));

        let opts = cfg.http().to_curl_options().unwrap();
        assert_eq!(opts.connect_timeout, Duration::from_secs(2));
        assert_eq!(opts.timeout, Duration::from_millis(10_500));
        assert!(!opts.follow_redirects);
        assert_eq!(opts.max_redirections, 3);
        assert_eq!(opts.max_response_bytes, 1 << 20);
    }

    #[test]
    fn max_response_bytes_defaults_when_missing() {
        let toml = r#"
            [http]
            connect_timeout_secs = 1
            timeout_secs = 5
            follow_redirects = true
            max_redirections = 2
        "#;
        let cfg: ResilientConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.http().max_response_bytes, DEFAULT_MAX_RESPONSE_BYTES);
    }

    #[test]
    fn to_policy_carries_bounds_and_budget() {
        let retry = RetryConfig {
            retry_max: 2,
            wait_min_secs: 0.1,
            wait_max_secs: 0.4,
        };
        let policy: Policy<(), ()> = retry.to_policy().unwrap();
        assert_eq!(policy.retry_max, 2);
        assert_eq!(policy.wait_min, Duration::from_millis(100));
        assert_eq!(policy.wait_max, Duration::from_millis(400));
    }

    #[test]
    fn invalid_waits_are_rejected() {
        let negative = RetryConfig {
            wait_min_secs: -1.0,
            ..RetryConfig::default()
        };
        assert!(negative.wait_bounds().is_err());

        let nan = RetryConfig {
            wait_max_secs: f64::NAN,
            ..RetryConfig::default()
        };
        assert!(nan.wait_bounds().is_err());

        let inverted = RetryConfig {
            wait_min_secs: 10.0,
            wait_max_secs: 1.0,
            ..RetryConfig::default()
        };
        let err = inverted.wait_bounds().unwrap_err();
        assert!(err.to_string().contains("must not exceed"));
    }

    #[test]
    fn load_or_init_creates_default_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = load_or_init_at(&path).unwrap();
        assert_eq!(cfg, ResilientConfig::default());
        assert!(path.exists());

        let reloaded = load_or_init_at(&path).unwrap();
        assert_eq!(reloaded, cfg);
    }

    #[test]
    fn load_or_init_reads_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[retry]\nretry_max = 9\nwait_min_secs = 0\nwait_max_secs = 0\n").unwrap();
        let cfg = load_or_init_at(&path).unwrap();
        assert_eq!(cfg.retry().retry_max, 9);
        assert!(cfg.http.is_none());
    }

    #[test]
    fn load_or_init_reports_parse_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[retry]\nretry_max = \"lots\"\n").unwrap();
        let err = load_or_init_at(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing config"));
    }
}
