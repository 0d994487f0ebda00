//! Utility modules for the transfer service.

pub mod errors;
pub mod logger;

pub use errors::{ProxyError, Result};
