//! File name masks (`*.csv`, `report-??.txt`, ...).

use crate::utils::ProxyError;
use glob::{MatchOptions, Pattern};
use std::fmt;

/// A compiled glob matched against bare file names, never against paths.
#[derive(Clone)]
pub struct FileMask {
    raw: String,
    pattern: Pattern,
}

impl FileMask {
    /// Compile a mask. A blank mask matches every file.
    pub fn new(mask: &str) -> Result<Self, ProxyError> {
        let raw = match mask.trim() {
            "" => "*".to_string(),
            m => m.to_string(),
        };
        let pattern = Pattern::new(&raw).map_err(|e| ProxyError::InvalidMask {
            mask: raw.clone(),
            reason: e.msg.to_string(),
        })?;
        Ok(Self { raw, pattern })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.pattern.matches_with(
            file_name,
            MatchOptions {
                case_sensitive: true,
                require_literal_separator: true,
                require_literal_leading_dot: false,
            },
        )
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Debug for FileMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileMask({:?})", self.raw)
    }
}

impl fmt::Display for FileMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for FileMask {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}
