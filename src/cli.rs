// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for settings operations
//!
//! This module provides command-line functionality for:
//! - Listing active and filtered settings
//! - Changing a setting and printing everything it affected
//! - Inspecting dependencies of a setting

use camera_settings::Config;
use camera_settings::errors::StoreError;
use camera_settings::settings::{ChangeKind, ChangeSet, DeviceCapabilities, SettingsManager};
use camera_settings::storage::{JsonFileStore, MemoryStore, PersistentStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Load capabilities, open the camera's store and initialize a manager
pub fn open_manager(
    config: &Config,
    capabilities: &Path,
    camera: Option<&str>,
) -> Result<SettingsManager, Box<dyn std::error::Error>> {
    let caps = DeviceCapabilities::from_path(capabilities)?;
    let camera_id = camera
        .map(str::to_string)
        .or_else(|| Some(caps.camera_id.clone()).filter(|id| !id.is_empty()))
        .or_else(|| config.last_camera_id.clone())
        .unwrap_or_else(|| "0".to_string());

    let store_dir = config.store_dir()?;
    let store: Box<dyn PersistentStore + Send> = match JsonFileStore::open(&store_dir, &camera_id) {
        Ok(store) => {
            info!(path = %store.path().display(), "Using settings file");
            Box::new(store)
        }
        Err(e @ StoreError::UnsupportedVersion { .. }) => {
            warn!(error = %e, "Settings file not readable by this version, using empty settings");
            Box::new(MemoryStore::new())
        }
        Err(e) => return Err(e.into()),
    };

    let mut manager = SettingsManager::new(
        Arc::new(config.catalog()?),
        config.dependency_graph(),
        store,
    );
    manager.initialize(Box::new(caps))?;
    Ok(manager)
}

pub fn show(manager: &SettingsManager) -> CliResult {
    let engine = manager.engine();
    if engine.active_keys().is_empty() {
        println!("No settings available.");
        return Ok(());
    }

    println!("Active settings:");
    println!();
    for key in engine.active_keys() {
        let value = engine.effective_value(key).unwrap_or_default();
        match engine.overridden_by(key) {
            Some(controller) => println!("  {key} = {value}  (locked by {controller})"),
            None => println!("  {key} = {value}"),
        }
        if let Some(domain) = engine.supported_domain(key) {
            println!("      Values: {}", domain.join(", "));
        }
    }
    Ok(())
}

pub fn set(manager: &mut SettingsManager, key: &str, value: &str) -> CliResult {
    let changes = manager.set_value(key, value)?;
    print_changes(&changes);
    Ok(())
}

pub fn set_index(manager: &mut SettingsManager, key: &str, index: usize) -> CliResult {
    let changes = manager.set_value_by_index(key, index)?;
    print_changes(&changes);
    Ok(())
}

pub fn filtered(manager: &SettingsManager) -> CliResult {
    let filtered = manager.filtered_out_keys();
    if filtered.is_empty() {
        println!("Every declared setting is available.");
        return Ok(());
    }
    println!("Not available on this camera:");
    for key in filtered {
        println!("  {key}");
    }
    Ok(())
}

pub fn deps(manager: &SettingsManager, key: &str) -> CliResult {
    if manager.supported_domain(key).is_none() {
        return Err(format!("Setting {key} is not available on this camera").into());
    }

    let dependents = manager.dependent_keys(key);
    if dependents.is_empty() {
        println!("{key} does not affect other settings.");
    } else {
        println!("{key} affects: {}", dependents.join(", "));
    }

    let controllers = manager.controllers_of(key);
    if !controllers.is_empty() {
        println!("{key} is listed by: {}", controllers.join(", "));
    }
    if let Some(controller) = manager.overridden_by(key) {
        println!("{key} is locked by {controller}");
    }
    Ok(())
}

pub fn restore(manager: &mut SettingsManager) -> CliResult {
    let changes = manager.restore_defaults()?;
    println!("Settings restored to defaults.");
    print_changes(&changes);
    Ok(())
}

fn print_changes(changes: &ChangeSet) {
    if changes.is_empty() {
        println!("Nothing changed.");
        return;
    }
    for change in changes {
        let label = match change.kind {
            ChangeKind::Set => "set",
            ChangeKind::Released => "released",
            ChangeKind::Forced => "forced",
            ChangeKind::DomainReset => "reset",
        };
        println!("  {} = {}  ({label})", change.key, change.effective_value());
    }
    for key in changes.refreshed() {
        println!("  {key}: supported values refreshed");
    }
}
