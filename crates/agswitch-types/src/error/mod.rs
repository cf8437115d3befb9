//! Typed error definitions for agswitch.
//!
//! This module provides a structured error hierarchy with specific error types
//! for different domains. All errors are designed to be:
//!
//! - **Serializable** for IPC responses via serde
//! - **Displayable** for logging via Display trait
//! - **Matchable** for error handling logic via enum variants

mod account;
mod profile;
mod switch;

pub use account::AccountError;
pub use profile::ProfileError;
pub use switch::{SwitchFailure, SwitchFailureReason};

use serde::{Deserialize, Serialize};

/// Coarse error taxonomy surfaced to callers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Account, version, backup file, or baseline absent
    NotFound,
    /// Operation not allowed in the current state
    InvalidState,
    /// Target process could not be stopped or started
    ProcessLifecycle,
    /// Fingerprint or data swap failed
    DataIntegrity,
    Unknown,
}
