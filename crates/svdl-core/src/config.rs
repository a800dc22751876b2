use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::coordinator::DEFAULT_WORKERS;
use crate::retry::RetryPolicy;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per segment (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

/// Global configuration loaded from `~/.config/svdl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvdlConfig {
    /// Number of concurrent segment downloads.
    pub workers: usize,
    /// External concat tool invoked for the merge (must support
    /// `-f concat -safe 0 -i <list> -c copy <output>`).
    pub tool: String,
    /// Directory for partially/fully downloaded segment files.
    pub tmp_dir: PathBuf,
    /// Directory for merged output files.
    pub out_dir: PathBuf,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for SvdlConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            tool: "ffmpeg".to_string(),
            tmp_dir: PathBuf::from("tmp"),
            out_dir: PathBuf::from("out"),
            retry: None,
        }
    }
}

impl SvdlConfig {
    /// Effective retry policy: the `[retry]` section when present, else defaults.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
            .as_ref()
            .map(RetryConfig::to_policy)
            .unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("svdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<SvdlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = SvdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: SvdlConfig = toml::from_str(&data)?;
    Ok(cfg)
}
