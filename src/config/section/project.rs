//! `[project]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [project]
//! root = "app"                # Project tree (edited documents)
//! components = "components"   # Component tree
//! index = "index.html"        # Bound when a client announces an empty path
//! ignore = ["node_modules"]   # Directory names skipped when scanning
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Watched project layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project tree root, relative to the config directory.
    pub root: PathBuf,

    /// Component tree root, relative to the config directory.
    pub components: PathBuf,

    /// Index document, relative to the project root.
    pub index: String,

    /// Directory names never descended into.
    pub ignore: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("app"),
            components: PathBuf::from("components"),
            index: "index.html".to_string(),
            ignore: vec!["node_modules".to_string(), ".git".to_string()],
        }
    }
}
