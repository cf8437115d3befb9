//! Account switch orchestration.
//!
//! - [`SwitchGuard`]: FIFO single-flight queue shared by all scopes
//! - [`SwitchFlow`]: stop, apply fingerprint, swap data, restart, with rollback
//! - [`SwitchMetrics`]: per-scope outcome counters

mod flow;
mod guard;
mod metrics;


pub use flow::{SwitchFlow, SwitchFlowConfig, SwitchFlowReport, SwitchFlowState};
pub use guard::SwitchGuard;
pub use metrics::{describe_switch_metrics, SwitchMetrics};
