// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{APP_DIR_NAME, CONFIG_FILE_NAME};
use crate::errors::{AppError, AppResult};
use crate::settings::graph::{DependencyGraph, EmbeddedGraph, JsonFileGraph, load_or_empty};
use crate::settings::SettingsCatalog;
use crate::storage::JsonFileStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Application configuration, read from `config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding per-camera settings files
    pub store_dir: Option<PathBuf>,
    /// Catalog to use instead of the bundled one
    pub catalog_path: Option<PathBuf>,
    /// Dependency graph to use instead of the bundled one
    pub dependency_graph_path: Option<PathBuf>,
    /// Tracing filter used when `RUST_LOG` is not set
    pub log_filter: String,
    /// Camera selected in the previous session
    pub last_camera_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: None,
            catalog_path: None,
            dependency_graph_path: None,
            log_filter: "warn".to_string(),
            last_camera_id: None,
        }
    }
}

impl Config {
    /// Platform location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from `path`, or from [`Self::default_path`] when `None`
    ///
    /// A missing file gives the defaults.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&contents)
            .map_err(|e| AppError::config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml_str(contents: &str) -> AppResult<Self> {
        toml::from_str(contents).map_err(|e| AppError::config(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> AppResult<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| AppError::config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Settings directory, falling back to the platform data dir
    pub fn store_dir(&self) -> AppResult<PathBuf> {
        self.store_dir
            .clone()
            .or_else(JsonFileStore::default_dir)
            .ok_or_else(|| AppError::config("no data directory available for settings files"))
    }

    pub fn catalog(&self) -> AppResult<SettingsCatalog> {
        match &self.catalog_path {
            Some(path) => SettingsCatalog::from_path(path),
            None => SettingsCatalog::embedded(),
        }
    }

    /// Dependency graph; an unusable graph file degrades to an empty graph
    pub fn dependency_graph(&self) -> Arc<DependencyGraph> {
        match &self.dependency_graph_path {
            Some(path) => load_or_empty(&JsonFileGraph::new(path)),
            None => load_or_empty(&EmbeddedGraph),
        }
    }
}
