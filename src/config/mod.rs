//! Configuration management for `tether.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # [project], [serve], [client]
//! ├── types/         # ConfigError
//! └── mod.rs         # SyncConfig (this file)
//! ```
//!
//! All paths in the file are relative to the directory holding it. When no
//! config file is found the working directory becomes the root and every
//! section takes its defaults.

pub mod section;
pub mod types;
mod util;

pub use section::{ClientConfig, ProjectConfig, ServeConfig};
pub use types::ConfigError;

use util::find_config_file;

use crate::{
    cli::{Cli, Commands},
    debug, log,
    utils::path::{normalize_path, relative_key},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing tether.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Watched roots
    #[serde(default)]
    pub project: ProjectConfig,

    /// Server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Editor client settings
    #[serde(default)]
    pub client: ClientConfig,
}

impl SyncConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd to find the config file. The root is the
    /// config file's parent directory, or cwd when there is none.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let (mut config, config_path) = match find_config_file(&cli.config) {
            Some(path) => (Self::from_path(&path)?, path),
            None => {
                debug!("config"; "no {} found, using defaults", cli.config.display());
                (Self::default(), cwd.join(&cli.config))
            }
        };

        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(cwd);

        config.config_path = config_path;
        config.set_root(&root);
        config.apply_command_options(cli);
        config.validate()?;

        Ok(config)
    }

    /// Set the root directory (normalized to an absolute path)
    pub fn set_root(&mut self, root: &Path) {
        self.root = normalize_path(root);
    }

    /// Apply CLI overrides for the running command.
    fn apply_command_options(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Serve {
                interface,
                port,
                ws_port,
                watch,
            } => {
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
                Self::update_option(&mut self.serve.ws_port, ws_port.as_ref());
                Self::update_option(&mut self.serve.watch, watch.as_ref());
            }
            Commands::Tree { client, .. }
            | Commands::Push { client, .. }
            | Commands::Attach { client, .. } => {
                Self::update_option(&mut self.client.url, client.url.as_ref());
            }
            Commands::Format { .. } => {}
        }
    }

    fn update_option<T: Clone>(target: &mut T, value: Option<&T>) {
        if let Some(v) = value {
            *target = v.clone();
        }
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serve.port == self.serve.ws_port {
            return Err(ConfigError::Validation(format!(
                "[serve] port and ws_port are both {}",
                self.serve.port
            )));
        }
        if self.project.root == self.project.components {
            return Err(ConfigError::Validation(format!(
                "[project] root and components both point to `{}`",
                self.project.root.display()
            )));
        }
        if self.serve.notify_window_ms == 0 {
            return Err(ConfigError::Validation(
                "[serve] notify_window_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // paths
    // ------------------------------------------------------------------------

    /// Absolute project tree root
    pub fn project_dir(&self) -> PathBuf {
        self.root.join(&self.project.root)
    }

    /// Absolute component tree root
    pub fn components_dir(&self) -> PathBuf {
        self.root.join(&self.project.components)
    }

    /// Absolute path of an internal script file
    pub fn script_path(&self, file: &Path) -> PathBuf {
        self.root.join(file)
    }

    /// Tree key for an absolute path: relative to the root, `/`-separated
    /// (e.g. `app/index.html`).
    pub fn tree_key(&self, path: &Path) -> Option<String> {
        relative_key(path, &self.root)
    }

    // ------------------------------------------------------------------------
    // parsing
    // ------------------------------------------------------------------------

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }
}

#[cfg(test)]
pub fn test_parse_config(content: &str) -> SyncConfig {
    let (parsed, ignored) = SyncConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_fields_collected() {
        let (_, ignored) =
            SyncConfig::parse_with_ignored("[serve]\nport = 1\nbogus = true\n[extra]\nx = 1")
                .unwrap();
        assert!(ignored.iter().any(|f| f.contains("bogus")));
        assert!(ignored.iter().any(|f| f.contains("extra")));
    }

    #[test]
    fn test_invalid_toml() {
        let result = SyncConfig::parse_with_ignored("[serve\nport = ");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_validate_port_collision() {
        let config = test_parse_config("[serve]\nport = 9000\nws_port = 9000");
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_same_roots() {
        let config = test_parse_config("[project]\nroot = \"site\"\ncomponents = \"site\"");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_defaults_ok() {
        assert!(test_parse_config("").validate().is_ok());
    }

    #[test]
    fn test_tree_key() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut config = SyncConfig::default();
        config.set_root(temp.path());

        let path = config.project_dir().join("pages").join("about.html");
        assert_eq!(config.tree_key(&path).as_deref(), Some("app/pages/about.html"));
        assert_eq!(config.tree_key(Path::new("/elsewhere/x.html")), None);
    }
}
