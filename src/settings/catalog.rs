// SPDX-License-Identifier: GPL-3.0-only

//! Declared settings
//!
//! The catalog lists every setting the application knows about, independent of
//! any camera. Each device session narrows it down to the settings the device
//! can actually offer (see [`super::capabilities`]).

use crate::assets;
use crate::constants::CATALOG_ASSET;
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// One declared setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingDeclaration {
    /// Stable key shared with the dependency graph and the store
    pub key: String,
    /// Values the application knows how to apply, in display order
    ///
    /// `None` takes whatever the device reports (picture sizes, ISO steps).
    #[serde(default)]
    pub candidates: Option<Vec<String>>,
    /// Value used when nothing valid has been persisted
    #[serde(default)]
    pub default: Option<String>,
    /// Initialization fails if the device reports nothing for this setting
    #[serde(default)]
    pub required: bool,
    /// Settings whose value change re-queries this setting's domain
    #[serde(default)]
    pub refresh_on: Vec<String>,
}

impl SettingDeclaration {
    pub fn new<I, S>(key: impl Into<String>, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            candidates: Some(candidates.into_iter().map(Into::into).collect()),
            default: None,
            required: false,
            refresh_on: Vec::new(),
        }
    }

    /// Declaration that accepts any device-reported value
    pub fn open(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            candidates: None,
            default: None,
            required: false,
            refresh_on: Vec::new(),
        }
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn refreshes_on(mut self, trigger: impl Into<String>) -> Self {
        self.refresh_on.push(trigger.into());
        self
    }
}

/// Ordered set of declared settings
///
/// Order is significant: it fixes the iteration order of the active setting
/// set and of every diagnostic listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsCatalog {
    declarations: Vec<SettingDeclaration>,
}

impl SettingsCatalog {
    pub fn from_declarations(declarations: Vec<SettingDeclaration>) -> AppResult<Self> {
        let mut seen = HashSet::new();
        for declaration in &declarations {
            if declaration.key.is_empty() {
                return Err(AppError::catalog("setting with empty key"));
            }
            if !seen.insert(declaration.key.as_str()) {
                return Err(AppError::catalog(format!(
                    "duplicate setting key {}",
                    declaration.key
                )));
            }
        }
        Ok(Self { declarations })
    }

    pub fn from_json_str(json: &str) -> AppResult<Self> {
        let declarations: Vec<SettingDeclaration> = serde_json::from_str(json)?;
        Self::from_declarations(declarations)
    }

    pub fn from_path(path: &Path) -> AppResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Catalog bundled with the application
    pub fn embedded() -> AppResult<Self> {
        let json = assets::text(CATALOG_ASSET)
            .ok_or_else(|| AppError::catalog(format!("asset {CATALOG_ASSET} not found")))?;
        Self::from_json_str(&json)
    }

    pub fn get(&self, key: &str) -> Option<&SettingDeclaration> {
        self.declarations.iter().find(|d| d.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SettingDeclaration> {
        self.declarations.iter()
    }

    /// Declarations whose domain depends on `trigger`'s value
    pub fn refreshing_on<'a>(
        &'a self,
        trigger: &'a str,
    ) -> impl Iterator<Item = &'a SettingDeclaration> + 'a {
        self.declarations
            .iter()
            .filter(move |d| d.refresh_on.iter().any(|t| t == trigger))
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}
