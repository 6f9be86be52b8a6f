//! Service configuration loading
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority, applied by the binary)
//! 2. Environment variable (via clap `env` attributes in the binary)
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Runtime configuration for the render service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// HTTP listen port
    pub port: u16,
    /// Directory where rendered preview artifacts are written
    pub artifact_dir: PathBuf,
    /// Worker pool size: maximum simultaneously rendering jobs
    pub max_concurrent_renders: usize,
    /// Retention window for terminal jobs before sweep deletion (seconds)
    pub job_retention_secs: u64,
    /// Interval between ledger sweep passes (seconds)
    pub sweep_interval_secs: u64,
    /// Maximum duration of a single render stage before the job is failed (seconds)
    pub stage_timeout_secs: u64,
    /// Buffered capacity of the job event broadcast channel
    pub event_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 5760,
            artifact_dir: default_artifact_dir(),
            max_concurrent_renders: 2,
            job_retention_secs: 30 * 60,
            sweep_interval_secs: 60,
            stage_timeout_secs: 300,
            event_capacity: 100,
        }
    }
}

/// Partial configuration as read from a TOML file; unset keys keep defaults
#[derive(Debug, Default, Deserialize)]
struct ConfigOverlay {
    port: Option<u16>,
    artifact_dir: Option<PathBuf>,
    max_concurrent_renders: Option<usize>,
    job_retention_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
    stage_timeout_secs: Option<u64>,
    event_capacity: Option<usize>,
}

impl ServiceConfig {
    /// Load configuration, overlaying a TOML file onto the defaults
    ///
    /// `explicit_path` wins over the platform config file location; with
    /// neither present the compiled defaults are returned.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = match explicit_path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_file(),
        };

        let mut config = Self::default();
        let Some(path) = path else {
            return Ok(config);
        };

        if !path.exists() {
            if explicit_path.is_some() {
                return Err(Error::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Ok(config);
        }

        let content = std::fs::read_to_string(&path)?;
        let overlay: ConfigOverlay = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded config overlay from {}", path.display());

        if let Some(port) = overlay.port {
            config.port = port;
        }
        if let Some(dir) = overlay.artifact_dir {
            config.artifact_dir = dir;
        }
        if let Some(n) = overlay.max_concurrent_renders {
            config.max_concurrent_renders = n.max(1);
        }
        if let Some(secs) = overlay.job_retention_secs {
            config.job_retention_secs = secs;
        }
        if let Some(secs) = overlay.sweep_interval_secs {
            config.sweep_interval_secs = secs.max(1);
        }
        if let Some(secs) = overlay.stage_timeout_secs {
            config.stage_timeout_secs = secs.max(1);
        }
        if let Some(n) = overlay.event_capacity {
            config.event_capacity = n.max(1);
        }

        Ok(config)
    }
}

/// Platform config file location: `<config_dir>/mixdown/config.toml`
fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mixdown").join("config.toml"))
}

/// Platform default artifact directory
fn default_artifact_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mixdown").join("previews"))
        .unwrap_or_else(|| PathBuf::from("./mixdown_previews"))
}
