// SPDX-License-Identifier: GPL-3.0-only

//! Declarative dependency graph
//!
//! The graph maps a controlling setting and one of its values to the values it
//! forces on other settings:
//!
//! ```json
//! { "scene_mode": { "hdr": { "flash_mode": "off" }, "default": {} } }
//! ```
//!
//! A `"default"` rule applies whenever the controller's value has no rule of
//! its own. The graph is read-only once loaded and can be shared between
//! engines through an [`Arc`].

use crate::assets;
use crate::constants::{DEFAULT_RULE, DEPENDENCY_ASSET};
use crate::errors::GraphDataError;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Forced values imposed by one rule: dependent key -> forced value
pub type DependencyList = BTreeMap<String, String>;

/// Immutable dependency rules for every controlling setting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    rules: HashMap<String, HashMap<String, DependencyList>>,
}

impl DependencyGraph {
    /// Graph with no cross-setting effects
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a JSON document, skipping malformed rules
    ///
    /// Only a document that is not JSON, or whose root is not an object, is an
    /// error. Individual entries of the wrong shape are dropped with a warning.
    pub fn from_json_str(json: &str) -> Result<Self, GraphDataError> {
        let root: Value = serde_json::from_str(json)?;
        Self::from_value(&root)
    }

    pub fn from_value(root: &Value) -> Result<Self, GraphDataError> {
        let root = root.as_object().ok_or(GraphDataError::NotAnObject)?;
        let mut graph = Self::empty();

        for (controller, rules) in root {
            let Some(rules) = rules.as_object() else {
                warn!(controller = %controller, "Dependency rules are not an object, skipping");
                continue;
            };
            for (value, list) in rules {
                let Some(list) = list.as_object() else {
                    warn!(
                        controller = %controller,
                        value = %value,
                        "Dependency list is not an object, skipping"
                    );
                    continue;
                };
                let mut forced = DependencyList::new();
                for (dependent, forced_value) in list {
                    match forced_value {
                        Value::String(s) => {
                            forced.insert(dependent.clone(), s.clone());
                        }
                        Value::Number(n) => {
                            forced.insert(dependent.clone(), n.to_string());
                        }
                        Value::Bool(b) => {
                            forced.insert(dependent.clone(), b.to_string());
                        }
                        other => {
                            warn!(
                                controller = %controller,
                                value = %value,
                                dependent = %dependent,
                                forced = %other,
                                "Unsupported forced value, skipping"
                            );
                        }
                    }
                }
                graph
                    .rules
                    .entry(controller.clone())
                    .or_default()
                    .insert(value.clone(), forced);
            }
        }
        Ok(graph)
    }

    /// Add one rule, replacing any previous rule for the same controller value
    pub fn with_rule<I, K, V>(mut self, controller: &str, value: &str, forced: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let list = forced
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.rules
            .entry(controller.to_string())
            .or_default()
            .insert(value.to_string(), list);
        self
    }

    /// All rules of one controlling setting
    pub fn rules_for(&self, key: &str) -> Option<&HashMap<String, DependencyList>> {
        self.rules.get(key)
    }

    /// Name of the rule that applies to `key` holding `value`
    ///
    /// Returns `value` itself when it has a rule, `"default"` when the
    /// controller has a fallback, and `None` when neither exists.
    pub fn rule_name<'a>(&'a self, key: &str, value: &'a str) -> Option<&'a str> {
        let rules = self.rules.get(key)?;
        if rules.contains_key(value) {
            Some(value)
        } else if rules.contains_key(DEFAULT_RULE) {
            Some(DEFAULT_RULE)
        } else {
            None
        }
    }

    /// Forced values implied by `key` holding `value`
    pub fn dependency_list(&self, key: &str, value: &str) -> Option<&DependencyList> {
        let name = self.rule_name(key, value)?;
        self.rules.get(key)?.get(name)
    }

    /// Every setting that controls at least one other setting
    pub fn controllers(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Supplies the static dependency data
pub trait DependencyGraphSource {
    fn load(&self) -> Result<DependencyGraph, GraphDataError>;
}

/// Graph bundled with the application
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedGraph;

impl DependencyGraphSource for EmbeddedGraph {
    fn load(&self) -> Result<DependencyGraph, GraphDataError> {
        let json = assets::text(DEPENDENCY_ASSET)
            .ok_or_else(|| GraphDataError::Missing(DEPENDENCY_ASSET.to_string()))?;
        DependencyGraph::from_json_str(&json)
    }
}

/// Graph read from a JSON file on disk
#[derive(Debug, Clone)]
pub struct JsonFileGraph {
    pub path: PathBuf,
}

impl JsonFileGraph {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DependencyGraphSource for JsonFileGraph {
    fn load(&self) -> Result<DependencyGraph, GraphDataError> {
        let json = std::fs::read_to_string(&self.path).map_err(|source| GraphDataError::Io {
            path: self.path.clone(),
            source,
        })?;
        DependencyGraph::from_json_str(&json)
    }
}

impl DependencyGraphSource for DependencyGraph {
    fn load(&self) -> Result<DependencyGraph, GraphDataError> {
        Ok(self.clone())
    }
}

/// Load a graph, degrading to an empty one if the source is unusable
pub fn load_or_empty(source: &dyn DependencyGraphSource) -> Arc<DependencyGraph> {
    match source.load() {
        Ok(graph) => Arc::new(graph),
        Err(e) => {
            warn!(error = %e, "Dependency graph unavailable, settings will not affect each other");
            Arc::new(DependencyGraph::empty())
        }
    }
}
