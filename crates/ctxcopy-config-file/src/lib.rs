//! File-based settings for ctxcopy
//!
//! This crate loads the masking configuration snapshot taken at the start
//! of every copy operation. Settings live in a single YAML or TOML file,
//! `~/.ctxcopy/config.yaml` by default.
//!
//! # Example
//! ```no_run
//! # use ctxcopy_config_file::Settings;
//! # fn example() -> ctxcopy_mask::Result<()> {
//! let mut settings = Settings::from_file("~/.ctxcopy/config.yaml")?;
//! settings.merge_env();
//! assert!(settings.masking.confidence_threshold <= 1.0);
//! # Ok(())
//! # }
//! ```

mod settings;

pub use settings::{
    DEFAULT_CONFIG_PATH, LoggingConfig, Settings, default_config_path, expand_tilde, load_settings,
};
