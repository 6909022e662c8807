// SPDX-License-Identifier: GPL-3.0-only

//! Which controllers currently list each dependent setting

use std::collections::HashMap;

/// Dependent key -> controlling keys whose current value lists it
///
/// Controllers are kept in registration order; the first one still present
/// is the one whose forced value takes over when another releases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReverseDependencyIndex {
    controllers: HashMap<String, Vec<String>>,
}

impl ReverseDependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `controller` for `dependent`; returns false if already present
    pub fn add(&mut self, dependent: &str, controller: &str) -> bool {
        let entry = self.controllers.entry(dependent.to_string()).or_default();
        if entry.iter().any(|c| c == controller) {
            return false;
        }
        entry.push(controller.to_string());
        true
    }

    /// Unregister `controller` for `dependent`; returns false if it was absent
    pub fn remove(&mut self, dependent: &str, controller: &str) -> bool {
        let Some(entry) = self.controllers.get_mut(dependent) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|c| c != controller);
        let removed = entry.len() != before;
        if entry.is_empty() {
            self.controllers.remove(dependent);
        }
        removed
    }

    /// Drop every controller of `dependent`
    pub fn clear_dependent(&mut self, dependent: &str) {
        self.controllers.remove(dependent);
    }

    pub fn controllers_of(&self, dependent: &str) -> &[String] {
        self.controllers
            .get(dependent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, dependent: &str, controller: &str) -> bool {
        self.controllers_of(dependent).iter().any(|c| c == controller)
    }

    pub fn has_controllers(&self, dependent: &str) -> bool {
        !self.controllers_of(dependent).is_empty()
    }
}
