//! Run configuration – reads/writes `~/.meshbridge/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use meshbridge_middleware::DEFAULT_ZMQ_URL;
use meshbridge_runtime::{VisualizerConfig, DEFAULT_DRAW_PERIOD, DEFAULT_PREFIX};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Settings for one `meshbridge` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// ZeroMQ endpoint of the meshcat server.
    pub zmq_url: String,
    /// Scene node owned by this run.
    pub prefix: String,
    /// Seconds between pose publishes.
    pub draw_period_s: f64,
    /// Simulation seconds per wall-clock second; `0` runs unpaced.
    pub target_realtime_rate: f64,
    /// Simulated seconds to run for.
    pub duration_s: f64,
    pub strict_frames: bool,
    /// Per-request reply timeout; `0` waits forever.
    pub request_timeout_ms: u64,
    /// Record every published bundle and request a replay at the end.
    pub animate: bool,
    /// Publish into an in-process scene instead of a live server.
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zmq_url: DEFAULT_ZMQ_URL.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            draw_period_s: 0.033333,
            target_realtime_rate: 1.0,
            duration_s: 10.0,
            strict_frames: false,
            request_timeout_ms: 0,
            animate: false,
            dry_run: false,
        }
    }
}

impl Config {
    /// Reject values the publish loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.draw_period_s > 0.0 && Duration::try_from_secs_f64(self.draw_period_s).is_ok()) {
            return Err(ConfigError::Invalid {
                field: "draw_period_s",
                reason: format!("must be a positive number of seconds, got {}", self.draw_period_s),
            });
        }
        if !(self.duration_s.is_finite() && self.duration_s >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "duration_s",
                reason: format!("must be non-negative, got {}", self.duration_s),
            });
        }
        if !self.target_realtime_rate.is_finite() {
            return Err(ConfigError::Invalid {
                field: "target_realtime_rate",
                reason: "must be finite".to_string(),
            });
        }
        if self.target_realtime_rate > 0.0
            && Duration::try_from_secs_f64(self.duration_s / self.target_realtime_rate).is_err()
        {
            return Err(ConfigError::Invalid {
                field: "target_realtime_rate",
                reason: format!(
                    "{} s at {}x real time does not fit in wall-clock time",
                    self.duration_s, self.target_realtime_rate
                ),
            });
        }
        if self.prefix.is_empty() || self.prefix.contains('/') {
            return Err(ConfigError::Invalid {
                field: "prefix",
                reason: format!("must be a single non-empty path segment, got {:?}", self.prefix),
            });
        }
        Ok(())
    }

    /// Falls back to [`DEFAULT_DRAW_PERIOD`] for a value [`validate`](Self::validate)
    /// would reject.
    pub fn draw_period(&self) -> Duration {
        Duration::try_from_secs_f64(self.draw_period_s)
            .ok()
            .filter(|p| !p.is_zero())
            .unwrap_or(DEFAULT_DRAW_PERIOD)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    pub fn visualizer(&self) -> VisualizerConfig {
        VisualizerConfig {
            prefix: self.prefix.clone(),
            draw_period: self.draw_period(),
            strict_frames: self.strict_frames,
        }
    }
}

/// Return the path to `~/.meshbridge/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".meshbridge").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, ConfigError> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut cfg: Config = toml::from_str(&raw)?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `MESHBRIDGE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `MESHBRIDGE_ZMQ_URL` | `zmq_url` |
/// | `MESHBRIDGE_PREFIX` | `prefix` |
/// | `MESHBRIDGE_DURATION` | `duration_s` |
/// | `MESHBRIDGE_REALTIME_RATE` | `target_realtime_rate` |
///
/// Unparseable numbers are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("MESHBRIDGE_ZMQ_URL") {
        cfg.zmq_url = v;
    }
    if let Ok(v) = std::env::var("MESHBRIDGE_PREFIX") {
        cfg.prefix = v;
    }
    if let Ok(v) = std::env::var("MESHBRIDGE_DURATION")
        && let Ok(d) = v.parse::<f64>()
    {
        cfg.duration_s = d;
    }
    if let Ok(v) = std::env::var("MESHBRIDGE_REALTIME_RATE")
        && let Ok(r) = v.parse::<f64>()
    {
        cfg.target_realtime_rate = r;
    }
}

/// Save the config to disk, creating `~/.meshbridge/` if necessary.
pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let raw = toml::to_string_pretty(cfg)?;
    fs::write(path, raw).map_err(write_err)
}
