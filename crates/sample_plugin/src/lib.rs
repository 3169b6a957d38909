// crates/sample_plugin/src/lib.rs
//! Sample Spot plug-in: live-view and variable actions, standard event logging,
//! and a variable backup when the host closes.

pub mod config;
pub mod logging;
pub mod shims;
pub mod state;

pub use config::{PluginConfig, CONFIG_ENV_VAR};
pub use shims::{install, PluginInitialize};
pub use state::{backup_path, Plugin, ACTION_CONCAT_ARGS, ACTION_START_LIVE};
