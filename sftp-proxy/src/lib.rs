//! SFTP proxy library
//!
//! Scheduled file transfer between local folders and an SFTP server:
//! incremental or full downloads, uploads with backup, cron or interval
//! schedules, and at most one run per job at a time.

pub mod config;
pub mod daemon;
pub mod fs;
pub mod history;
pub mod jobs;
pub mod model;
pub mod scheduler;
pub mod service;
pub mod transport;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use service::TransferService;
pub use utils::errors::ProxyError;
pub type Result<T> = std::result::Result<T, ProxyError>;
