//! Error types for the transfer service.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid file mask '{mask}': {reason}")]
    InvalidMask { mask: String, reason: String },

    #[error("Invalid history entry name: {0:?}")]
    InvalidHistoryName(String),

    #[error("Transfer of '{file}' failed: {reason}")]
    Transfer { file: String, reason: String },

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
}

pub type Result<T> = std::result::Result<T, ProxyError>;
