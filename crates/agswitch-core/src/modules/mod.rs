//! Switch orchestration, device profiles, and the collaborators they drive.

pub mod account;
pub mod config;
pub mod device;
pub mod history;
pub mod logger;
pub mod process;
pub mod state_db;
pub mod switch;
