use crate::error::{KernelError, KernelResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct KernelConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding one append-only log per domain.
    pub data_dir: PathBuf,
    /// Seconds without a detections post before occupancy is forgotten.
    pub inactivity_timeout_secs: u64,
    /// History step used when a query omits `step`.
    pub default_step_secs: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            inactivity_timeout_secs: 10,
            default_step_secs: 60.0,
        }
    }
}

impl KernelConfig {
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn validate(&self) -> KernelResult<()> {
        if self.inactivity_timeout_secs == 0 {
            return Err(KernelError::Config(
                "inactivity_timeout_secs must be greater than zero".into(),
            ));
        }
        if !(self.default_step_secs.is_finite() && self.default_step_secs > 0.0) {
            return Err(KernelError::Config(
                "default_step_secs must be a positive number".into(),
            ));
        }
        Ok(())
    }

    /// Applies `BREEZE_*` overrides on top of the file values.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("BREEZE_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("BREEZE_PORT") {
            match port.parse() {
                Ok(p) => self.port = p,
                Err(_) => warn!(value = %port, "ignoring invalid BREEZE_PORT"),
            }
        }
        if let Some(dir) = lookup("BREEZE_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup("BREEZE_INACTIVITY_TIMEOUT_SECS") {
            match secs.parse() {
                Ok(s) => self.inactivity_timeout_secs = s,
                Err(_) => warn!(value = %secs, "ignoring invalid BREEZE_INACTIVITY_TIMEOUT_SECS"),
            }
        }
    }
}

pub async fn load_config_from(path: &Path) -> KernelConfig {
    if !path.exists() {
        warn!(path = %path.display(), "no config file, using defaults");
        return KernelConfig::default();
    }

    let txt = fs::read_to_string(path).await.unwrap_or_default();
    if txt.trim().is_empty() {
        return KernelConfig::default();
    }
    match serde_yaml::from_str(&txt) {
        Ok(cfg) => {
            info!(path = %path.display(), "config loaded");
            cfg
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "invalid config, using defaults");
            KernelConfig::default()
        }
    }
}

/// Loads `BREEZE_KERNEL_CONFIG` (default `kernel.yaml`), then env overrides.
pub async fn load_config() -> KernelResult<KernelConfig> {
    let path = std::env::var("BREEZE_KERNEL_CONFIG").unwrap_or_else(|_| "kernel.yaml".into());
    let mut cfg = load_config_from(Path::new(&path)).await;
    cfg.apply_env(|key| std::env::var(key).ok());
    cfg.validate()?;
    Ok(cfg)
}
