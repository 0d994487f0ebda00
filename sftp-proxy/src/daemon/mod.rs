//! Process lifecycle helpers for running as a long-lived daemon.

pub mod shutdown;
