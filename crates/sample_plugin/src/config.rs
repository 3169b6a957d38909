// crates/sample_plugin/src/config.rs

use std::path::Path;

use serde::Deserialize;

/// Names the TOML settings file. Unset means built-in defaults.
pub const CONFIG_ENV_VAR: &str = "SPOT_PLUGIN_CONFIG";

/// Plug-in settings. Every field is optional in the file.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PluginConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub log_filter: String,
    /// Longest text value read from the host, in bytes.
    pub text_read_limit: usize,
    /// File name, under the host's preferences folder, written on exit.
    pub backup_file_name: String,
    pub log_standard_events: bool,
    /// Idle notifications to observe before the idle listener unbinds. 0 disables it.
    pub idle_notification_limit: u32,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            text_read_limit: spot_interop::variables::DEFAULT_TEXT_READ_LIMIT,
            backup_file_name: "BackupVars".to_string(),
            log_standard_events: true,
            idle_notification_limit: 10,
        }
    }
}

impl PluginConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Settings from the file named by [`CONFIG_ENV_VAR`], or defaults.
    pub fn load() -> Self {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::load_from(Path::new(&path)),
            None => Self::default(),
        }
    }

    /// Settings from `path`. A file that cannot be read or parsed is reported
    /// and replaced by defaults; a bad settings file never stops the plug-in loading.
    pub fn load_from(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "cannot read plug-in config; using defaults"
                );
                return Self::default();
            }
        };
        match Self::from_toml_str(&text) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "invalid plug-in config; using defaults"
                );
                Self::default()
            }
        }
    }
}
