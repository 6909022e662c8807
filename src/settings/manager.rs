// SPDX-License-Identifier: GPL-3.0-only

//! Settings facade
//!
//! [`SettingsManager`] wraps a [`ConstraintEngine`] with the side effects of an
//! accepted change: refreshing dependent domains, persisting base values and
//! notifying observers.

use super::capabilities::CapabilityProvider;
use super::catalog::SettingsCatalog;
use super::engine::ConstraintEngine;
use super::graph::{DependencyGraph, EmbeddedGraph, load_or_empty};
use super::observer::{Observer, ObserverId, ObserverRegistry};
use super::values::{ChangeKind, ChangeSet, ValueState};
use crate::errors::{AppResult, EngineError, InitError};
use crate::storage::{MemoryStore, PersistentStore};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct SettingsManager {
    engine: ConstraintEngine,
    store: Box<dyn PersistentStore + Send>,
    observers: ObserverRegistry,
    capabilities: Option<Box<dyn CapabilityProvider + Send>>,
}

impl SettingsManager {
    pub fn new(
        catalog: Arc<SettingsCatalog>,
        graph: Arc<DependencyGraph>,
        store: Box<dyn PersistentStore + Send>,
    ) -> Self {
        Self {
            engine: ConstraintEngine::new(catalog, graph),
            store,
            observers: ObserverRegistry::new(),
            capabilities: None,
        }
    }

    /// Manager using the bundled catalog and dependency graph
    pub fn with_embedded(store: Box<dyn PersistentStore + Send>) -> AppResult<Self> {
        let catalog = Arc::new(SettingsCatalog::embedded()?);
        Ok(Self::new(catalog, load_or_empty(&EmbeddedGraph), store))
    }

    /// Build the active settings for a camera
    ///
    /// The provider is kept for runtime domain refresh and [`Self::restore_defaults`].
    pub fn initialize(
        &mut self,
        capabilities: Box<dyn CapabilityProvider + Send>,
    ) -> Result<(), InitError> {
        self.capabilities = None;
        self.engine.initialize(capabilities.as_ref(), self.store.as_ref())?;
        self.capabilities = Some(capabilities);
        Ok(())
    }

    /// Swap the persistent store, e.g. when another camera is selected
    ///
    /// Takes effect at the next [`Self::initialize`].
    pub fn set_store(&mut self, store: Box<dyn PersistentStore + Send>) {
        self.store = store;
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<ChangeSet, EngineError> {
        let mut changes = match self.engine.set_value(key, value) {
            Ok(changes) => changes,
            Err(e) => {
                if e.is_unknown_setting() {
                    debug!(key, "Ignoring change of setting not offered by this camera");
                } else {
                    debug!(key, value, error = %e, "Setting change rejected");
                }
                return Err(e);
            }
        };
        if changes.is_empty() {
            return Ok(changes);
        }

        if let Some(capabilities) = &self.capabilities {
            self.engine
                .refresh_domains(key, capabilities.as_ref(), &mut changes);
        }
        self.persist(&changes);
        self.observers.notify(&changes);
        Ok(changes)
    }

    pub fn set_value_by_index(&mut self, key: &str, index: usize) -> Result<ChangeSet, EngineError> {
        let value = self.engine.value_at(key, index)?;
        self.set_value(key, &value)
    }

    /// Forget every persisted value and rebuild from declared defaults
    ///
    /// Observers receive the settings whose effective value changed. If the
    /// rebuild fails, the store and the current values are left untouched.
    pub fn restore_defaults(&mut self) -> AppResult<ChangeSet> {
        let mut changes = ChangeSet::default();
        let Some(capabilities) = &self.capabilities else {
            self.store.clear()?;
            return Ok(changes);
        };

        let mut engine = self.engine.clone();
        engine.initialize(capabilities.as_ref(), &MemoryStore::new())?;
        self.store.clear()?;

        let before = std::mem::replace(&mut self.engine, engine).value_states();
        for key in self.engine.active_keys() {
            let Some(state) = self.engine.value_state(key) else {
                continue;
            };
            let changed = before
                .get(key)
                .is_none_or(|old| old.effective() != state.effective());
            if changed {
                changes.push(key, ChangeKind::Set, state);
            }
        }

        info!(changed = changes.len(), "Settings restored to defaults");
        if !changes.is_empty() {
            self.observers.notify(&changes);
        }
        Ok(changes)
    }

    pub fn register_observer(&mut self, observer: Box<dyn Observer + Send>) -> ObserverId {
        self.observers.register(observer)
    }

    pub fn unregister_observer(&mut self, id: ObserverId) -> bool {
        self.observers.unregister(id)
    }

    /// Write the base values an accepted change produced
    ///
    /// Failures are logged; the in-memory change stands.
    fn persist(&mut self, changes: &ChangeSet) {
        for change in changes {
            if !matches!(change.kind, ChangeKind::Set | ChangeKind::DomainReset) {
                continue;
            }
            if let Err(e) = self.store.set_value(&change.key, &change.state.base) {
                warn!(key = %change.key, error = %e, "Failed to persist setting");
            }
        }
    }

    pub fn engine(&self) -> &ConstraintEngine {
        &self.engine
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.is_initialized()
    }

    pub fn effective_value(&self, key: &str) -> Option<&str> {
        self.engine.effective_value(key)
    }

    pub fn is_overridden(&self, key: &str) -> bool {
        self.engine.is_overridden(key)
    }

    pub fn supported_domain(&self, key: &str) -> Option<&[String]> {
        self.engine.supported_domain(key)
    }

    pub fn filtered_out_keys(&self) -> BTreeSet<String> {
        self.engine.filtered_out_keys()
    }

    pub fn overridden_keys(&self) -> Vec<&str> {
        self.engine.overridden_keys()
    }

    pub fn value_index(&self, key: &str) -> Option<usize> {
        self.engine.value_index(key)
    }

    pub fn dependent_keys(&self, key: &str) -> Vec<String> {
        self.engine.dependent_keys(key)
    }

    pub fn controllers_of(&self, key: &str) -> &[String] {
        self.engine.controllers_of(key)
    }

    pub fn overridden_by(&self, key: &str) -> Option<&str> {
        self.engine.overridden_by(key)
    }

    pub fn value_states(&self) -> HashMap<String, ValueState> {
        self.engine.value_states()
    }
}

impl std::fmt::Debug for SettingsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsManager")
            .field("engine", &self.engine)
            .field("observers", &self.observers)
            .field("has_capabilities", &self.capabilities.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;
    use crate::settings::capabilities::DeviceCapabilities;
    use crate::settings::catalog::SettingDeclaration;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Store shared with the test so writes can be inspected
    #[derive(Clone, Default)]
    struct SharedStore(Arc<Mutex<MemoryStore>>);

    impl PersistentStore for SharedStore {
        fn get_value(&self, key: &str) -> Option<String> {
            self.0.lock().unwrap().get_value(key)
        }
        fn set_value(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            self.0.lock().unwrap().set_value(key, value)
        }
        fn remove(&mut self, key: &str) -> Result<(), StoreError> {
            self.0.lock().unwrap().remove(key)
        }
        fn clear(&mut self) -> Result<(), StoreError> {
            self.0.lock().unwrap().clear()
        }
    }

    struct FailingStore;

    impl PersistentStore for FailingStore {
        fn get_value(&self, _key: &str) -> Option<String> {
            None
        }
        fn set_value(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::UnsupportedVersion {
                found: 0,
                supported: 0,
            })
        }
        fn remove(&mut self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
        fn clear(&mut self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn manager(store: Box<dyn PersistentStore + Send>) -> SettingsManager {
        let catalog = SettingsCatalog::from_declarations(vec![
            SettingDeclaration::new("scene_mode", ["auto", "hdr"]).with_default("auto"),
            SettingDeclaration::new("flash_mode", ["off", "auto"]).with_default("auto"),
            SettingDeclaration::new("timer", ["off", "2"]).with_default("off"),
        ])
        .unwrap();
        let graph = DependencyGraph::empty().with_rule("scene_mode", "hdr", [("flash_mode", "off")]);
        let caps = DeviceCapabilities::new("0")
            .with("scene_mode", ["auto", "hdr"])
            .with("flash_mode", ["off", "auto"])
            .with("timer", ["off", "2"]);

        let mut manager = SettingsManager::new(Arc::new(catalog), Arc::new(graph), store);
        manager.initialize(Box::new(caps)).unwrap();
        manager
    }

    #[test]
    fn test_only_base_values_persisted() {
        let store = SharedStore::default();
        let mut manager = manager(Box::new(store.clone()));

        manager.set_value("scene_mode", "hdr").unwrap();
        assert_eq!(store.get_value("scene_mode").as_deref(), Some("hdr"));
        assert!(store.get_value("flash_mode").is_none());
    }

    #[test]
    fn test_observers_skip_empty_changes() {
        let calls = Arc::new(Mutex::new(0));
        let mut manager = manager(Box::new(MemoryStore::new()));
        let counter = Arc::clone(&calls);
        manager.register_observer(Box::new(move |_: &ChangeSet| {
            *counter.lock().unwrap() += 1;
        }));

        manager.set_value("timer", "off").unwrap();
        assert_eq!(*calls.lock().unwrap(), 0);
        manager.set_value("timer", "2").unwrap();
        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(manager.set_value("timer", "7").is_err());
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_store_failure_keeps_change() {
        let mut manager = manager(Box::new(FailingStore));
        let changes = manager.set_value("timer", "2").unwrap();
        assert_eq!(changes.keys(), vec!["timer"]);
        assert_eq!(manager.effective_value("timer"), Some("2"));
    }

    #[test]
    fn test_restore_defaults() {
        let store = SharedStore::default();
        let mut manager = manager(Box::new(store.clone()));
        manager.set_value("scene_mode", "hdr").unwrap();
        manager.set_value("timer", "2").unwrap();

        let changes = manager.restore_defaults().unwrap();
        assert_eq!(changes.keys(), vec!["scene_mode", "flash_mode", "timer"]);
        assert_eq!(manager.effective_value("scene_mode"), Some("auto"));
        assert!(!manager.is_overridden("flash_mode"));
        assert!(store.get_value("timer").is_none());
    }

    #[test]
    fn test_observers_called_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = manager(Box::new(MemoryStore::new()));
        for name in ["first", "second"] {
            let log = Arc::clone(&log);
            manager.register_observer(Box::new(move |changes: &ChangeSet| {
                log.lock().unwrap().push((name, changes.len()));
            }));
        }

        manager.set_value("timer", "2").unwrap();
        manager.set_value("timer", "2").unwrap();
        manager.set_value("scene_mode", "hdr").unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec![("first", 1), ("second", 1), ("first", 2), ("second", 2)]
        );
    }

    /// Provider that stops reporting anything once `gone` is set
    struct Detachable {
        caps: DeviceCapabilities,
        gone: Arc<AtomicBool>,
    }

    impl CapabilityProvider for Detachable {
        fn supported_values(&self, key: &str) -> Option<Vec<String>> {
            if self.gone.load(Ordering::SeqCst) {
                return None;
            }
            self.caps.supported_values(key)
        }
    }

    #[test]
    fn test_failed_restore_keeps_store_and_values() {
        let catalog = SettingsCatalog::from_declarations(vec![
            SettingDeclaration::new("scene_mode", ["auto", "hdr"])
                .with_default("auto")
                .required(),
            SettingDeclaration::new("timer", ["off", "2"]).with_default("off"),
        ])
        .unwrap();
        let gone = Arc::new(AtomicBool::new(false));
        let provider = Detachable {
            caps: DeviceCapabilities::new("0")
                .with("scene_mode", ["auto", "hdr"])
                .with("timer", ["off", "2"]),
            gone: Arc::clone(&gone),
        };
        let store = SharedStore::default();
        let mut manager = SettingsManager::new(
            Arc::new(catalog),
            Arc::new(DependencyGraph::empty()),
            Box::new(store.clone()),
        );
        manager.initialize(Box::new(provider)).unwrap();
        manager.set_value("timer", "2").unwrap();

        gone.store(true, Ordering::SeqCst);
        assert!(manager.restore_defaults().is_err());
        assert_eq!(store.get_value("timer").as_deref(), Some("2"));
        assert!(manager.is_initialized());
        assert_eq!(manager.effective_value("timer"), Some("2"));
    }

    #[test]
    fn test_unknown_key_is_reported() {
        let mut manager = manager(Box::new(MemoryStore::new()));
        let err = manager.set_value("hdr", "enable").unwrap_err();
        assert!(err.is_unknown_setting());
    }
}
