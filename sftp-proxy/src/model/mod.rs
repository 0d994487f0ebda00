//! Job and path-pair configuration, normalized at load time.

pub mod job_config;
pub mod mask;
pub mod path_config;

pub use job_config::{JobConfig, SessionOptions, DEFAULT_INTERVAL_SECS};
pub use mask::FileMask;
pub use path_config::PathConfig;
