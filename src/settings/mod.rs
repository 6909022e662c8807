// SPDX-License-Identifier: GPL-3.0-only

//! Camera settings with cross-setting constraints
//!
//! - [`catalog`]: settings the application declares
//! - [`capabilities`]: what a device supports, and domain filtering
//! - [`graph`]: which values force which other values
//! - [`engine`]: active settings of one session and change resolution
//! - [`manager`]: engine plus persistence and notification
//!
//! Changing `scene_mode` to `hdr` with the bundled graph, for example, forces
//! `flash_mode` to `off` until the scene changes back; the user's own flash
//! choice is remembered underneath and returns when the lock is released.

pub mod capabilities;
pub mod catalog;
pub mod engine;
pub mod graph;
pub mod manager;
pub mod observer;
pub mod reverse_index;
pub mod values;

pub use capabilities::{CapabilityProvider, DeviceCapabilities};
pub use catalog::{SettingDeclaration, SettingsCatalog};
pub use engine::ConstraintEngine;
pub use graph::{DependencyGraph, DependencyGraphSource, EmbeddedGraph, JsonFileGraph};
pub use manager::SettingsManager;
pub use observer::{ChannelObserver, Observer, ObserverId};
pub use values::{ChangeKind, ChangeSet, SettingChange, ValueState};
