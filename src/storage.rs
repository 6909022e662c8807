// SPDX-License-Identifier: MPL-2.0

//! Persistent storage for chosen setting values
//!
//! Only base values are ever stored; forced values are recomputed from the
//! dependency graph on every initialization.

use crate::constants::{APP_DIR_NAME, STORE_VERSION, keys};
use crate::errors::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Key-value store for base setting values
pub trait PersistentStore {
    fn get_value(&self, key: &str) -> Option<String>;
    fn set_value(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// In-memory store, lost when dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PersistentStore for MemoryStore {
    fn get_value(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set_value(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.values.clear();
        Ok(())
    }
}

/// On-disk layout of a settings file
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    #[serde(default)]
    saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    values: BTreeMap<String, String>,
}

/// JSON file holding the values of one camera
///
/// The whole file is rewritten on every change.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Default directory for settings files
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join(APP_DIR_NAME))
    }

    /// File name used for a camera id
    pub fn file_name(camera_id: &str) -> String {
        let id: String = camera_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("settings-{id}.json")
    }

    /// Open the store of `camera_id` inside `dir`
    pub fn open(dir: &Path, camera_id: &str) -> Result<Self, StoreError> {
        Self::open_path(dir.join(Self::file_name(camera_id)))
    }

    /// Open a settings file, migrating it to the current version
    ///
    /// A missing or unparsable file yields an empty store. A file written by a
    /// newer version is rejected.
    pub fn open_path(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No settings file yet");
                return Ok(Self {
                    path,
                    values: BTreeMap::new(),
                });
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let document: Value = match serde_json::from_str(&contents) {
            Ok(document) => document,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Settings file is corrupt, starting empty");
                return Ok(Self {
                    path,
                    values: BTreeMap::new(),
                });
            }
        };

        let found = document.get("version").and_then(Value::as_u64).unwrap_or(1);
        let version = match u32::try_from(found) {
            Ok(version) if version <= STORE_VERSION => version,
            _ => {
                return Err(StoreError::UnsupportedVersion {
                    found: u32::try_from(found).unwrap_or(u32::MAX),
                    supported: STORE_VERSION,
                });
            }
        };

        let values = document
            .get("values")
            .and_then(Value::as_object)
            .map(|values| {
                values
                    .iter()
                    .filter_map(|(key, value)| scalar_to_string(value).map(|v| (key.clone(), v)))
                    .collect()
            })
            .unwrap_or_default();

        let mut store = Self { path, values };
        if version < STORE_VERSION {
            migrate(&mut store.values, version);
            info!(
                path = %store.path.display(),
                from = version,
                to = STORE_VERSION,
                "Migrated settings file"
            );
            store.save()?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    fn save(&self) -> Result<(), StoreError> {
        let io_error = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let file = StoreFile {
            version: STORE_VERSION,
            saved_at: Some(Utc::now()),
            values: self.values.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        // Replace atomically
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_error)?;
        std::fs::rename(&tmp, &self.path).map_err(io_error)?;
        Ok(())
    }
}

impl PersistentStore for JsonFileStore {
    fn get_value(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set_value(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.values.get(key).is_some_and(|v| v == value) {
            return Ok(());
        }
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.values.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.values.clear();
        self.save()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Upgrade stored values one version at a time
fn migrate(values: &mut BTreeMap<String, String>, from: u32) {
    for version in from.max(1)..STORE_VERSION {
        match version {
            // JPEG quality used to be stored as a percentage
            1 => {
                if let Some(quality) = values.get_mut(keys::JPEG_QUALITY) {
                    let level = match quality.as_str() {
                        "65" => "normal",
                        "75" => "fine",
                        _ => "superfine",
                    };
                    *quality = level.to_string();
                }
            }
            // Video sizes were renamed; old entries cannot be mapped
            2 => {
                values.remove(keys::VIDEO_QUALITY);
            }
            _ => {}
        }
        debug!(from = version, to = version + 1, "Applied settings migration");
    }
}
