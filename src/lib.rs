// SPDX-License-Identifier: MPL-2.0

//! Camera Settings - constraint-aware camera settings
//!
//! This library keeps the user-facing settings of a camera consistent with
//! each other and with what the device supports.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`settings`]: Declared settings, dependency graph and the constraint engine
//! - [`storage`]: Persisted base values per camera
//! - [`config`]: User configuration handling
//! - [`errors`]: Error types
//!
//! # Example
//!
//! ```no_run
//! use camera_settings::settings::{DeviceCapabilities, SettingsManager};
//! use camera_settings::storage::MemoryStore;
//!
//! # fn main() -> camera_settings::errors::AppResult<()> {
//! let mut manager = SettingsManager::with_embedded(Box::new(MemoryStore::new()))?;
//! let caps = DeviceCapabilities::from_path("caps.json".as_ref())?;
//! manager.initialize(Box::new(caps))?;
//!
//! let changes = manager.set_value("scene_mode", "hdr")?;
//! for change in &changes {
//!     println!("{} = {}", change.key, change.effective_value());
//! }
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod config;
pub mod constants;
pub mod errors;
pub mod settings;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use errors::{AppError, AppResult, EngineError};
pub use settings::{ChangeSet, ConstraintEngine, SettingsManager};
pub use storage::{JsonFileStore, MemoryStore, PersistentStore};
