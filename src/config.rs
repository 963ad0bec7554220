//! loop-convert configuration
//!
//! Read from `--config <path>` or from `loop-convert.toml` in the working
//! directory:
//!
//! ```toml
//! [rewrite]
//! element_type = "auto &"
//!
//! [frontend]
//! follow_includes = true
//! include_dirs = ["include"]
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::DEFAULT_ELEMENT_TYPE;
use crate::driver::ConversionOptions;
use crate::error::{LoopConvertError, Result};
use crate::frontend::FrontendOptions;

/// Config file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "loop-convert.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ConvertConfig {
    /// How rewritten loops are spelled
    #[serde(default)]
    pub rewrite: RewriteConfig,

    /// What the parser sees
    #[serde(default)]
    pub frontend: FrontendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewriteConfig {
    /// Type written before the loop variable, e.g. `auto &` or `const auto &`
    #[serde(default = "default_element_type")]
    pub element_type: String,
}

fn default_element_type() -> String {
    DEFAULT_ELEMENT_TYPE.to_string()
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            element_type: default_element_type(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrontendConfig {
    #[serde(default = "default_follow_includes")]
    pub follow_includes: bool,

    /// Relative entries are resolved against the config file's directory
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,
}

fn default_follow_includes() -> bool {
    true
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            follow_includes: default_follow_includes(),
            include_dirs: Vec::new(),
        }
    }
}

impl ConvertConfig {
    /// Load the explicit config if given, else `loop-convert.toml` in `cwd`
    /// if it exists, else defaults.
    pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        match explicit {
            Some(path) if !path.exists() => Err(LoopConvertError::ConfigError {
                message: format!("Config file not found: {}", path.display()),
            }),
            Some(path) => Self::load_from(path),
            None => Self::load_from(&cwd.join(CONFIG_FILE_NAME)),
        }
    }

    /// Load configuration from a specific path; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| LoopConvertError::ConfigError {
            message: format!("Failed to parse config {}: {}", path.display(), e),
        })?;

        if config.rewrite.element_type.trim().is_empty() {
            return Err(LoopConvertError::ConfigError {
                message: "rewrite.element_type must not be empty".to_string(),
            });
        }

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for dir in &mut config.frontend.include_dirs {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }

        tracing::debug!("[CONFIG] Loaded {}", path.display());
        Ok(config)
    }

    /// Build run options, with command-line include dirs searched after the
    /// configured ones
    pub fn conversion_options(
        &self,
        extra_include_dirs: &[PathBuf],
        no_includes: bool,
        count_only: bool,
    ) -> ConversionOptions {
        let mut include_dirs = self.frontend.include_dirs.clone();
        include_dirs.extend(extra_include_dirs.iter().cloned());

        ConversionOptions {
            element_type: self.rewrite.element_type.trim().to_string(),
            frontend: FrontendOptions {
                follow_includes: self.frontend.follow_includes && !no_includes,
                include_dirs,
            },
            count_only,
        }
    }
}
