//! Service configuration.
//!
//! Loaded from a TOML file. It only says which jobs are enabled, where their
//! JSON job files live, and how to log; transfer settings live in the job files
//! (see [`crate::model::JobConfig`]).

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceInfo,

    #[serde(default = "default_download")]
    pub download: JobSettings,

    #[serde(default = "default_upload")]
    pub upload: JobSettings,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Service name
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Human-readable name shown at startup
    #[serde(default = "default_display_name")]
    pub display_name: String,

    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    /// Whether the job is scheduled at all
    #[serde(default)]
    pub enabled: bool,

    /// Path of the JSON job file
    pub config: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Append logs to this file instead of stdout
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_service_name() -> String {
    "sftp-proxy".to_string()
}

fn default_display_name() -> String {
    "SFTP Proxy Service".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_download() -> JobSettings {
    JobSettings {
        enabled: false,
        config: PathBuf::from("configDownload.json"),
    }
}

fn default_upload() -> JobSettings {
    JobSettings {
        enabled: false,
        config: PathBuf::from("configUpload.json"),
    }
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            display_name: default_display_name(),
            description: String::new(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceInfo::default(),
            download: default_download(),
            upload: default_upload(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Relative job file paths are resolved against the directory holding the
    /// configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        if let Some(base) = path.parent() {
            config.download.config = resolve(base, &config.download.config);
            config.upload.config = resolve(base, &config.upload.config);
        }
        Ok(config)
    }

    pub fn any_job_enabled(&self) -> bool {
        self.download.enabled || self.upload.enabled
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
