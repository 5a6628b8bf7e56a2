//! Settings file format and loading

use ctxcopy_mask::{Error, LargeInputPolicy, MaskingConfig, MaskingStrategy, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Location used when no settings path is given
pub const DEFAULT_CONFIG_PATH: &str = "~/.ctxcopy/config.yaml";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Everything read from the settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub masking: MaskingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Limits above which structural sniffing is skipped
    #[serde(default)]
    pub large_input: LargeInputPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `trace`, `debug`, `info`, `warn` or `error`
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Settings {
    /// Load settings from a YAML or TOML file.
    ///
    /// The format follows the extension (`.toml` is TOML, anything else is
    /// YAML). The result is normalized before it is returned.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_tilde(path.as_ref())?;

        if !path.exists() {
            return Err(Error::ConfigNotFound(path));
        }

        let contents = std::fs::read_to_string(&path)?;
        let parse_error =
            |e: &dyn std::fmt::Display| Error::Config(format!("{}: {}", path.display(), e));

        let settings: Settings = if contents.trim().is_empty() {
            Settings::default()
        } else if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents).map_err(|e| parse_error(&e))?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents).map_err(|e| parse_error(&e))?
        };

        info!("Loaded settings from {}", path.display());
        Ok(settings.normalize())
    }

    /// Normalize every section once, at load time
    pub fn normalize(mut self) -> Self {
        self.masking = self.masking.normalize();

        let level = self.logging.level.trim().to_lowercase();
        self.logging.level = if LOG_LEVELS.contains(&level.as_str()) {
            level
        } else {
            warn!("Unknown log level '{}', using 'warn'", self.logging.level);
            default_log_level()
        };

        if self.large_input.line_threshold == 0 {
            self.large_input.line_threshold = LargeInputPolicy::default().line_threshold;
        }

        self
    }

    /// Merge environment variables into settings (env vars take precedence)
    pub fn merge_env(&mut self) {
        self.merge_env_from(|key| std::env::var(key).ok());
    }

    fn merge_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("CTXCOPY_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Some(val) = lookup("CTXCOPY_MASKING") {
            match val.to_lowercase().as_str() {
                "1" | "true" | "on" => self.masking.enabled = true,
                "0" | "false" | "off" => self.masking.enabled = false,
                other => warn!("Ignoring CTXCOPY_MASKING={}", other),
            }
        }

        if let Some(val) = lookup("CTXCOPY_MASKING_STRATEGY") {
            match val.parse::<MaskingStrategy>() {
                Ok(strategy) => self.masking.strategy = strategy,
                Err(e) => warn!("Ignoring CTXCOPY_MASKING_STRATEGY: {}", e),
            }
        }

        if let Some(val) = lookup("CTXCOPY_HASH_SECRET") {
            self.masking.hash_secret = Some(val);
        }

        debug!(
            "Effective settings: masking {}, strategy {}, log level {}",
            self.masking.enabled,
            self.masking.strategy.as_str(),
            self.logging.level
        );

        let normalized = std::mem::take(self).normalize();
        *self = normalized;
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string())),
        Err(_) => Ok(path.to_path_buf()),
    }
}

/// The default settings file, `~/.ctxcopy/config.yaml`
pub fn default_config_path() -> Result<PathBuf> {
    expand_tilde(Path::new(DEFAULT_CONFIG_PATH))
}

/// Load settings from `path`, or from the default location
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::from_file(path),
        None => Settings::from_file(default_config_path()?),
    }
}
