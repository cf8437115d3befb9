//! # agswitch Core
//!
//! Account-switch orchestration for a desktop application that keeps one
//! signed-in identity and one device fingerprint per installation.
//!
//! ## Architecture
//!
//! ```text
//! agswitch-core/src/modules/
//! ├── switch/       # SwitchGuard (FIFO single-flight), SwitchFlow, SwitchMetrics
//! ├── account/      # AccountService: snapshots, switching, identity profiles
//! ├── device.rs     # DeviceProfileManager over storage.json + baseline
//! ├── history.rs    # per-account profile version history
//! ├── state_db.rs   # identity rows in state.vscdb (rusqlite)
//! ├── process/      # target process stop/start (sysinfo)
//! ├── config.rs     # config.json
//! └── logger.rs     # tracing subscriber
//! ```
//!
//! Every switch, local or cloud, runs through one [`SwitchGuard`] and one
//! [`SwitchFlow`]; collaborators sit behind traits so tests can inject fakes.

#![allow(
    clippy::significant_drop_tightening,
    reason = "Index and guard locks are held across short, explicit critical sections"
)]
#![allow(clippy::map_err_ignore, reason = "Error context is provided in the replacement message")]
#![cfg_attr(
    test,
    allow(clippy::panic, clippy::unwrap_used, clippy::assertions_on_result_states)
)]

pub mod error;
pub use agswitch_types::models;
pub mod modules;
pub mod utils;

// Re-export commonly used types
pub use error::{AppError, AppResult};
pub use models::{Account, AppConfig, DeviceProfile, SwitchScope};
pub use modules::account::{AccountService, AccountServiceParts, BindMode};
pub use modules::device::{generate_profile, get_storage_path, DeviceProfileManager};
pub use modules::history::{ProfileVersionHistory, RevisionTarget};
pub use modules::switch::{
    SwitchFlow, SwitchFlowConfig, SwitchFlowReport, SwitchFlowState, SwitchGuard, SwitchMetrics,
};
pub use utils::paths::DataPaths;
