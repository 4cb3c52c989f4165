//! # Configuration
//!
//! Override hierarchy: defaults → config file → env vars → CLI flags.
//!
//! The file lives at `$XDG_CONFIG_HOME/pinfo/config.toml`; every setting is
//! optional:
//!
//! ```toml
//! [general]
//! infopath = ["~/share/info", "/opt/info"]
//!
//! [search]
//! case_sensitive = false
//! regex = false
//! order = "document"     # or "next-chain"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;

use crate::document::TraversalOrder;
use crate::error::{Error, Result};
use crate::nav::SearchOptions;

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Directories searched for manuals before the built-in defaults.
    pub infopath: Option<Vec<PathBuf>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    pub case_sensitive: Option<bool>,
    pub regex: Option<bool>,
    pub order: Option<TraversalOrder>,
}

impl Config {
    /// Search defaults for new sessions.
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            regex: self.search.regex.unwrap_or(false),
            case_sensitive: self.search.case_sensitive.unwrap_or(false),
            order: self.search.order.unwrap_or_default(),
        }
    }

    /// Configured manual directories with `~` expanded.
    pub fn infopath(&self) -> Vec<PathBuf> {
        self.general
            .infopath
            .iter()
            .flatten()
            .map(|dir| expand_home(dir))
            .collect()
    }
}

/// Returns the path to `$XDG_CONFIG_HOME/pinfo/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pinfo").join("config.toml"))
}

/// Load the user's config. A missing file yields defaults.
pub fn load_config() -> Result<Config> {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => {
            debug!("no config directory, using default config");
            Ok(Config::default())
        }
    }
}

/// Load config from `path`. A missing file yields defaults; a malformed
/// one is an error.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!("no config file at {}", path.display());
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
    info!("loaded config from {}", path.display());
    debug!("config: {config:?}");
    Ok(config)
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
