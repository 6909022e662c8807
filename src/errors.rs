// SPDX-License-Identifier: MPL-2.0

//! Error types for the settings engine and its collaborators

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Rejected setting change
    #[error("Settings error: {0}")]
    Engine(#[from] EngineError),
    /// Device capabilities could not be applied
    #[error("Initialization error: {0}")]
    Init(#[from] InitError),
    /// Dependency graph could not be loaded
    #[error("Dependency graph error: {0}")]
    Graph(#[from] GraphDataError),
    /// Persisted settings could not be read or written
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
    /// Declared settings catalog is malformed
    #[error("Catalog error: {0}")]
    Catalog(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors returned to callers of the engine's mutating operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Key is not in the active set (never declared, or filtered out for this device)
    #[error("Unknown setting: {key}")]
    UnknownSetting { key: String },
    /// Value is outside the setting's current supported domain
    #[error("Invalid value {value:?} for setting {key}")]
    InvalidValue { key: String, value: String },
    /// Domain index past the end of the supported domain
    #[error("Index {index} out of range for setting {key} ({len} values)")]
    IndexOutOfRange { key: String, index: usize, len: usize },
    /// Mutation attempted before `initialize`
    #[error("Settings have not been initialized for a camera")]
    NotInitialized,
}

/// Errors raised while building the active setting set for a device
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    /// Provider reported nothing for a setting the catalog marks as required
    #[error("Device reports no capabilities for required setting {key}")]
    MissingCapability { key: String },
    /// Catalog declares no settings at all
    #[error("Settings catalog is empty")]
    EmptyCatalog,
}

/// Errors loading the declarative dependency graph
///
/// The engine never fails on these: callers substitute an empty graph.
#[derive(Debug, Error)]
pub enum GraphDataError {
    #[error("Failed to read dependency graph {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Dependency graph is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Top level of the document is not a JSON object
    #[error("Dependency graph root must be an object")]
    NotAnObject,
    /// Embedded asset missing from the binary
    #[error("Dependency graph asset {0} not found")]
    Missing(String),
}

/// Persistent store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// File was written by a newer schema than this build understands
    #[error("Settings file version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog(message.into())
    }
}

impl EngineError {
    /// Caller referenced a key that is not offered for this device
    ///
    /// The boundary treats these as silent no-ops.
    pub fn is_unknown_setting(&self) -> bool {
        matches!(self, Self::UnknownSetting { .. })
    }
}
