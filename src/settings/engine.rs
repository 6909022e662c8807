// SPDX-License-Identifier: GPL-3.0-only

//! Settings dependency resolution
//!
//! [`ConstraintEngine`] holds the active settings of one camera session and
//! applies the dependency graph when one of them changes.
//!
//! # Resolution
//!
//! A setting's rules are always resolved from its *base* value. When a
//! setting is set explicitly, the rule of its old base and the rule of its new
//! base are compared:
//!
//! - dependents listed only by the old rule are released
//! - dependents listed by the new rule are forced to the listed value
//!
//! Only the directly changed setting's rules are evaluated. A dependent that
//! gets forced does not in turn apply its own rules.
//!
//! When several controllers list the same dependent, the first one to force
//! it keeps it until it lets go; the override then passes to the next
//! controller still listing the dependent, or is cleared.

use super::capabilities::{CapabilityProvider, filter_domain};
use super::catalog::{SettingDeclaration, SettingsCatalog};
use super::graph::{DependencyGraph, DependencyList};
use super::reverse_index::ReverseDependencyIndex;
use super::values::{ChangeKind, ChangeSet, ValueState};
use crate::errors::{EngineError, InitError};
use crate::storage::PersistentStore;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// State built by one `initialize` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Session {
    /// Active keys in catalog order
    order: Vec<String>,
    domains: HashMap<String, Vec<String>>,
    values: HashMap<String, ValueState>,
    index: ReverseDependencyIndex,
    filtered_out: BTreeSet<String>,
}

impl Session {
    /// Value `controller`'s current rule forces on `dependent`, if valid for it
    fn forced_value(&self, graph: &DependencyGraph, controller: &str, dependent: &str) -> Option<String> {
        let base = &self.values.get(controller)?.base;
        let forced = graph.dependency_list(controller, base)?.get(dependent)?;
        if self.domains.get(dependent)?.contains(forced) {
            Some(forced.clone())
        } else {
            None
        }
    }
}

/// Constraint engine for one camera session
///
/// Not reentrant: every mutation runs to completion before the next one, so
/// callers sharing an engine between threads must serialize access.
#[derive(Debug, Clone)]
pub struct ConstraintEngine {
    catalog: Arc<SettingsCatalog>,
    graph: Arc<DependencyGraph>,
    session: Option<Session>,
}

impl ConstraintEngine {
    pub fn new(catalog: Arc<SettingsCatalog>, graph: Arc<DependencyGraph>) -> Self {
        Self {
            catalog,
            graph,
            session: None,
        }
    }

    pub fn catalog(&self) -> &SettingsCatalog {
        &self.catalog
    }

    pub fn graph(&self) -> &Arc<DependencyGraph> {
        &self.graph
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// Rebuild all state for a newly selected camera
    ///
    /// On error the engine is left uninitialized.
    pub fn initialize(
        &mut self,
        capabilities: &dyn CapabilityProvider,
        store: &dyn PersistentStore,
    ) -> Result<(), InitError> {
        self.session = None;
        if self.catalog.is_empty() {
            return Err(InitError::EmptyCatalog);
        }

        let mut session = Session::default();
        for declaration in self.catalog.iter() {
            let key = declaration.key.as_str();
            let reported = match Self::initial_report(declaration, capabilities, &session) {
                Some(reported) => reported,
                None if declaration.required => {
                    return Err(InitError::MissingCapability {
                        key: key.to_string(),
                    });
                }
                None => {
                    debug!(key, "Setting not offered by device");
                    session.filtered_out.insert(key.to_string());
                    continue;
                }
            };

            let domain = filter_domain(declaration, &reported);
            if domain.len() <= 1 {
                debug!(key, values = domain.len(), "Setting offers no choice, filtering out");
                session.filtered_out.insert(key.to_string());
                continue;
            }

            let base = resolve_base(declaration, &domain, store.get_value(key));
            session.order.push(key.to_string());
            session.values.insert(key.to_string(), ValueState::new(base));
            session.domains.insert(key.to_string(), domain);
        }

        // Register every controller whose base value forces a valid value on
        // an active dependent
        for controller in &session.order {
            let base = &session.values[controller].base;
            let Some(list) = self.graph.dependency_list(controller, base) else {
                continue;
            };
            for (dependent, forced) in list {
                let Some(domain) = session.domains.get(dependent) else {
                    continue;
                };
                if dependent == controller {
                    continue;
                }
                if domain.contains(forced) {
                    session.index.add(dependent, controller);
                } else {
                    warn!(dependent = %dependent, controller = %controller, forced = %forced, "Forced value not in domain, ignoring");
                }
            }
        }

        // Apply the first controller's forced value to each dependent
        for key in session.order.clone() {
            let forced = session
                .index
                .controllers_of(&key)
                .iter()
                .find_map(|c| session.forced_value(&self.graph, c, &key).map(|v| (c.clone(), v)));
            if let (Some((controller, value)), Some(state)) = (forced, session.values.get_mut(&key)) {
                state.force(&value, &controller);
            }
        }

        info!(
            active = session.order.len(),
            filtered = session.filtered_out.len(),
            overridden = session.values.values().filter(|s| s.is_overridden()).count(),
            "Settings initialized"
        );
        self.session = Some(session);
        Ok(())
    }

    /// Device report for a declaration at initialization time
    ///
    /// Settings that refresh on a trigger are queried against the trigger's
    /// already-resolved base value.
    fn initial_report(
        declaration: &SettingDeclaration,
        capabilities: &dyn CapabilityProvider,
        session: &Session,
    ) -> Option<Vec<String>> {
        let trigger = declaration
            .refresh_on
            .iter()
            .find_map(|t| session.values.get(t).map(|state| (t, state.base.as_str())));
        match trigger {
            Some((trigger, value)) => capabilities.dependent_values(&declaration.key, trigger, value),
            None => capabilities.supported_values(&declaration.key),
        }
    }

    /// Explicitly set a setting and resolve the dependents it controls
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<ChangeSet, EngineError> {
        let graph = Arc::clone(&self.graph);
        let session = self.session.as_mut().ok_or(EngineError::NotInitialized)?;

        let domain = session
            .domains
            .get(key)
            .ok_or_else(|| EngineError::UnknownSetting {
                key: key.to_string(),
            })?;
        if !domain.iter().any(|v| v == value) {
            return Err(EngineError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            });
        }

        let mut changes = ChangeSet::default();
        let Some(state) = session.values.get_mut(key) else {
            return Err(EngineError::UnknownSetting {
                key: key.to_string(),
            });
        };
        if state.effective() == value {
            return Ok(changes);
        }

        let old_base = std::mem::replace(&mut state.base, value.to_string());
        state.release();
        changes.push(key, ChangeKind::Set, state);
        session.index.clear_dependent(key);

        debug!(key, from = %old_base, to = value, "Setting changed");
        cascade(session, &graph, key, &old_base, value, &mut changes);
        Ok(changes)
    }

    /// [`Self::set_value`] with a position in the setting's current domain
    pub fn set_value_by_index(&mut self, key: &str, index: usize) -> Result<ChangeSet, EngineError> {
        let value = self.value_at(key, index)?;
        self.set_value(key, &value)
    }

    /// Value at `index` of the setting's current domain
    pub fn value_at(&self, key: &str, index: usize) -> Result<String, EngineError> {
        let domain = self.supported_domain(key).ok_or_else(|| {
            if self.is_initialized() {
                EngineError::UnknownSetting {
                    key: key.to_string(),
                }
            } else {
                EngineError::NotInitialized
            }
        })?;
        domain
            .get(index)
            .cloned()
            .ok_or_else(|| EngineError::IndexOutOfRange {
                key: key.to_string(),
                index,
                len: domain.len(),
            })
    }

    /// Re-query the domains that depend on `trigger`'s current value
    ///
    /// Refreshed keys are appended to `changes`. A base value that no longer
    /// fits its new domain is reset to the first entry, and the reset setting's
    /// own rules are applied. An override that no longer fits passes to the
    /// next controller that still forces a supported value, or is released.
    pub fn refresh_domains(
        &mut self,
        trigger: &str,
        capabilities: &dyn CapabilityProvider,
        changes: &mut ChangeSet,
    ) {
        let catalog = Arc::clone(&self.catalog);
        let graph = Arc::clone(&self.graph);
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(trigger_value) = session.values.get(trigger).map(|s| s.effective().to_string())
        else {
            return;
        };

        for declaration in catalog.refreshing_on(trigger) {
            let key = declaration.key.as_str();
            if !session.domains.contains_key(key) {
                continue;
            }
            let Some(reported) = capabilities.dependent_values(key, trigger, &trigger_value) else {
                warn!(key, trigger, value = %trigger_value, "No capabilities reported, keeping domain");
                continue;
            };
            let domain = filter_domain(declaration, &reported);
            let Some(first) = domain.first().cloned() else {
                warn!(key, trigger, value = %trigger_value, "Refreshed domain is empty, keeping domain");
                continue;
            };

            changes.push_refreshed(key);
            let reset_from = match session.values.get_mut(key) {
                Some(state) if !domain.contains(&state.base) => {
                    let old = std::mem::replace(&mut state.base, first.clone());
                    changes.push(key, ChangeKind::DomainReset, state);
                    Some(old)
                }
                _ => None,
            };
            session.domains.insert(key.to_string(), domain);
            revalidate_override(session, &graph, key, changes);

            if let Some(old_base) = reset_from {
                debug!(key, from = %old_base, to = %first, "Base value left refreshed domain");
                cascade(session, &graph, key, &old_base, &first, changes);
            }
        }
    }

    /// Effective value: override if present, else base
    pub fn effective_value(&self, key: &str) -> Option<&str> {
        self.session
            .as_ref()?
            .values
            .get(key)
            .map(ValueState::effective)
    }

    pub fn is_overridden(&self, key: &str) -> bool {
        self.value_state(key).is_some_and(ValueState::is_overridden)
    }

    pub fn value_state(&self, key: &str) -> Option<&ValueState> {
        self.session.as_ref()?.values.get(key)
    }

    /// Snapshot of every active setting's state
    pub fn value_states(&self) -> HashMap<String, ValueState> {
        self.session
            .as_ref()
            .map(|s| s.values.clone())
            .unwrap_or_default()
    }

    pub fn supported_domain(&self, key: &str) -> Option<&[String]> {
        self.session
            .as_ref()?
            .domains
            .get(key)
            .map(Vec::as_slice)
    }

    /// Position of the effective value within the supported domain
    pub fn value_index(&self, key: &str) -> Option<usize> {
        let value = self.effective_value(key)?;
        self.supported_domain(key)?.iter().position(|v| v == value)
    }

    /// Active keys in catalog order
    pub fn active_keys(&self) -> &[String] {
        self.session
            .as_ref()
            .map(|s| s.order.as_slice())
            .unwrap_or(&[])
    }

    /// Settings removed for this device because they offer no choice
    pub fn filtered_out_keys(&self) -> BTreeSet<String> {
        self.session
            .as_ref()
            .map(|s| s.filtered_out.clone())
            .unwrap_or_default()
    }

    /// Keys currently locked by another setting, in catalog order
    pub fn overridden_keys(&self) -> Vec<&str> {
        self.active_keys()
            .iter()
            .filter(|k| self.is_overridden(k))
            .map(String::as_str)
            .collect()
    }

    /// Controllers whose current rule lists `key`, in registration order
    pub fn controllers_of(&self, key: &str) -> &[String] {
        self.session
            .as_ref()
            .map(|s| s.index.controllers_of(key))
            .unwrap_or(&[])
    }

    /// Controller whose forced value is in force on `key`
    pub fn overridden_by(&self, key: &str) -> Option<&str> {
        self.value_state(key)?.overridden_by.as_deref()
    }

    /// Keys affected by `key`'s current value
    ///
    /// Dependents listed by its current rule, followed by settings whose
    /// domain refreshes on it.
    pub fn dependent_keys(&self, key: &str) -> Vec<String> {
        let Some(state) = self.value_state(key) else {
            return Vec::new();
        };
        let mut keys: Vec<String> = self
            .graph
            .dependency_list(key, &state.base)
            .map(|list| list.keys().cloned().collect())
            .unwrap_or_default();
        for declaration in self.catalog.refreshing_on(key) {
            if !keys.contains(&declaration.key) {
                keys.push(declaration.key.clone());
            }
        }
        keys
    }
}

/// Persisted value if still valid, else the declared default, else the first value
fn resolve_base(declaration: &SettingDeclaration, domain: &[String], persisted: Option<String>) -> String {
    if let Some(value) = persisted {
        if domain.contains(&value) {
            return value;
        }
        debug!(key = %declaration.key, value = %value, "Persisted value not supported, resetting");
    }
    declaration
        .default
        .as_ref()
        .filter(|d| domain.contains(d))
        .or_else(|| domain.first())
        .cloned()
        .unwrap_or_default()
}

/// Apply the difference between `key`'s old and new rule
fn cascade(
    session: &mut Session,
    graph: &DependencyGraph,
    key: &str,
    old_base: &str,
    new_base: &str,
    changes: &mut ChangeSet,
) {
    if graph.rule_name(key, old_base) == graph.rule_name(key, new_base) {
        return;
    }
    let empty = DependencyList::new();
    let old_list = graph.dependency_list(key, old_base).unwrap_or(&empty);
    let new_list = graph.dependency_list(key, new_base).unwrap_or(&empty);

    for dependent in old_list.keys().filter(|d| !new_list.contains_key(*d)) {
        release_dependent(session, graph, key, dependent, changes);
    }
    for (dependent, forced) in new_list {
        force_dependent(session, key, dependent, forced, changes);
    }
}

fn release_dependent(
    session: &mut Session,
    graph: &DependencyGraph,
    controller: &str,
    dependent: &str,
    changes: &mut ChangeSet,
) {
    if !session.index.has_controllers(dependent) {
        debug!(dependent, controller, "Nothing to release");
        return;
    }
    session.index.remove(dependent, controller);

    let forced_here = session
        .values
        .get(dependent)
        .is_some_and(|s| s.overridden_by.as_deref() == Some(controller));
    if !forced_here {
        return;
    }

    reassign_override(session, graph, controller, dependent, changes);
}

/// Hand `dependent`'s override from `controller` to the next registered
/// controller with a valid forced value, or release it
fn reassign_override(
    session: &mut Session,
    graph: &DependencyGraph,
    controller: &str,
    dependent: &str,
    changes: &mut ChangeSet,
) {
    let handover = session
        .index
        .controllers_of(dependent)
        .iter()
        .find_map(|c| session.forced_value(graph, c, dependent).map(|v| (c.clone(), v)));

    let Some(state) = session.values.get_mut(dependent) else {
        return;
    };
    match handover {
        Some((next, value)) => {
            debug!(dependent, from = controller, to = %next, "Override handed over");
            state.force(&value, &next);
            changes.push(dependent, ChangeKind::Forced, state);
        }
        None => {
            debug!(dependent, controller, "Override released");
            state.release();
            changes.push(dependent, ChangeKind::Released, state);
        }
    }
}

/// Drop controllers of `dependent` whose forced value left its refreshed
/// domain, and move an override that is no longer supported
fn revalidate_override(
    session: &mut Session,
    graph: &DependencyGraph,
    dependent: &str,
    changes: &mut ChangeSet,
) {
    let stale: Vec<String> = session
        .index
        .controllers_of(dependent)
        .iter()
        .filter(|c| session.forced_value(graph, c, dependent).is_none())
        .cloned()
        .collect();
    for controller in &stale {
        debug!(dependent, controller = %controller, "Forced value left refreshed domain");
        session.index.remove(dependent, controller);
    }

    let Some(state) = session.values.get(dependent) else {
        return;
    };
    let (Some(value), Some(owner)) = (state.overridden.as_deref(), state.overridden_by.clone()) else {
        return;
    };
    let supported = session
        .domains
        .get(dependent)
        .is_some_and(|d| d.iter().any(|v| v == value));
    if !supported {
        reassign_override(session, graph, &owner, dependent, changes);
    }
}

fn force_dependent(
    session: &mut Session,
    controller: &str,
    dependent: &str,
    forced: &str,
    changes: &mut ChangeSet,
) {
    if dependent == controller {
        warn!(controller, "Setting lists itself as a dependent, ignoring");
        return;
    }
    let Some(domain) = session.domains.get(dependent) else {
        debug!(dependent, controller, "Dependent not active on this device");
        return;
    };
    if !domain.iter().any(|v| v == forced) {
        warn!(dependent, controller, forced, "Forced value not in domain, ignoring");
        return;
    }

    session.index.add(dependent, controller);
    let Some(state) = session.values.get_mut(dependent) else {
        return;
    };
    if let Some(owner) = state.overridden_by.as_deref() {
        if owner != controller && session.index.contains(dependent, owner) {
            debug!(dependent, owner, controller, "Dependent already forced, keeping");
            return;
        }
    }
    if state.overridden.as_deref() == Some(forced) && state.overridden_by.as_deref() == Some(controller)
    {
        return;
    }
    state.force(forced, controller);
    changes.push(dependent, ChangeKind::Forced, state);
}
