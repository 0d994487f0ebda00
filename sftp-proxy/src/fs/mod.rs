//! Local file system helpers.

pub mod walker;
