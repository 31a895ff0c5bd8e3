//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tc_core::RuleConfig;

/// Application configuration.
///
/// ```toml
/// [rules]
/// violation_hour_threshold = 6.0
/// early_break_deadline_hours = 5.0
/// minimum_break_minutes = 30
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rules: RuleConfig,
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (TC_RULES__MINIMUM_BREAK_MINUTES=45)
        figment = figment.merge(Env::prefixed("TC_").split("__"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for tc.
///
/// On Linux: `~/.config/tc`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tc"))
}
