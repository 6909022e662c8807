// SPDX-License-Identifier: GPL-3.0-only

//! Per-setting value state and change reporting

/// Base value plus an optional value forced by another setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueState {
    /// Last explicitly chosen value (persisted)
    pub base: String,
    /// Value forced by a controller's dependency rule
    pub overridden: Option<String>,
    /// Controller whose rule produced `overridden`
    pub overridden_by: Option<String>,
}

impl ValueState {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            overridden: None,
            overridden_by: None,
        }
    }

    /// Value in force: the override if any, else the base
    pub fn effective(&self) -> &str {
        self.overridden.as_deref().unwrap_or(&self.base)
    }

    pub fn is_overridden(&self) -> bool {
        self.overridden.is_some()
    }

    pub(crate) fn force(&mut self, value: &str, controller: &str) {
        self.overridden = Some(value.to_string());
        self.overridden_by = Some(controller.to_string());
    }

    pub(crate) fn release(&mut self) {
        self.overridden = None;
        self.overridden_by = None;
    }
}

/// Why a setting appears in a [`ChangeSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Explicitly set by the caller
    Set,
    /// Override removed, back to its base value
    Released,
    /// Override applied or changed
    Forced,
    /// Base reset because a refreshed domain no longer contains it
    DomainReset,
}

/// One entry of a [`ChangeSet`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingChange {
    pub key: String,
    pub kind: ChangeKind,
    /// State right after the change
    pub state: ValueState,
}

impl SettingChange {
    pub fn effective_value(&self) -> &str {
        self.state.effective()
    }
}

/// Everything one `set_value` call changed, in resolution order
///
/// The changed setting comes first, then released dependents, then forced
/// dependents, then domain resets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    entries: Vec<SettingChange>,
    refreshed: Vec<String>,
}

impl ChangeSet {
    pub(crate) fn push(&mut self, key: &str, kind: ChangeKind, state: &ValueState) {
        self.entries.push(SettingChange {
            key: key.to_string(),
            kind,
            state: state.clone(),
        });
    }

    pub(crate) fn push_refreshed(&mut self, key: &str) {
        self.refreshed.push(key.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SettingChange> {
        self.entries.iter()
    }

    pub fn get(&self, key: &str) -> Option<&SettingChange> {
        self.entries.iter().find(|c| c.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|c| c.key.as_str()).collect()
    }

    /// Settings whose supported domain was re-queried
    pub fn refreshed(&self) -> &[String] {
        &self.refreshed
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a SettingChange;
    type IntoIter = std::slice::Iter<'a, SettingChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
