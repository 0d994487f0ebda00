//! Job files: session settings, schedule and path pairs for one job.

use super::path_config::{PathConfig, PathConfigFile};
use crate::scheduler::schedule::Schedule;
use crate::utils::ProxyError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_INTERVAL_SECS: i64 = 3600;

/// Job file as written on disk (JSON, camelCase keys).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfigFile {
    pub session: SessionOptions,

    #[serde(default = "default_interval")]
    pub interval_in_seconds: i64,

    #[serde(default)]
    pub cron_exp: Option<String>,

    #[serde(default)]
    pub paths: Vec<PathConfigFile>,
}

fn default_interval() -> i64 {
    DEFAULT_INTERVAL_SECS
}

/// Connection settings for the remote SFTP endpoint.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOptions {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub username: String,

    #[serde(default)]
    pub password: Option<String>,

    /// Private key used instead of the password when set
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,

    #[serde(default)]
    pub passphrase: Option<String>,

    /// Expected SHA-256 of the server host key, hex (colons allowed)
    #[serde(default)]
    pub host_key_sha256: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_port() -> u16 {
    22
}

fn default_timeout_secs() -> u64 {
    30
}

impl SessionOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn endpoint(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("private_key_path", &self.private_key_path)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "***"))
            .field("host_key_sha256", &self.host_key_sha256)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// A loaded, normalized job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub session: SessionOptions,
    pub schedule: Schedule,
    pub paths: Vec<PathConfig>,
}

impl JobConfig {
    /// Load and normalize a job file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ProxyError::Config(format!(
                "job file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let raw: JobConfigFile = serde_json::from_str(content)?;
        Self::from_file(raw)
    }

    pub fn from_file(raw: JobConfigFile) -> Result<Self> {
        if raw.session.host.trim().is_empty() {
            return Err(ProxyError::Config("session host is empty".into()));
        }

        let schedule = Schedule::resolve(raw.interval_in_seconds, raw.cron_exp.as_deref());
        let paths = raw
            .paths
            .into_iter()
            .map(PathConfig::from_file)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            session: raw.session,
            schedule,
            paths,
        })
    }
}
