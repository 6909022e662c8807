// SPDX-License-Identifier: GPL-3.0-only

//! Change notification

use super::values::ChangeSet;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Receives every accepted change
///
/// Called synchronously after the engine's state is final for that change.
pub trait Observer {
    fn on_settings_changed(&mut self, changes: &ChangeSet);
}

impl<F> Observer for F
where
    F: FnMut(&ChangeSet),
{
    fn on_settings_changed(&mut self, changes: &ChangeSet) {
        self(changes)
    }
}

/// Handle returned by registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Registered observers, notified in registration order
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: u64,
    observers: Vec<(ObserverId, Box<dyn Observer + Send>)>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Box<dyn Observer + Send>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    pub fn unregister(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    pub fn notify(&mut self, changes: &ChangeSet) {
        debug!(
            observers = self.observers.len(),
            changed = changes.len(),
            "Notifying settings observers"
        );
        for (_, observer) in &mut self.observers {
            observer.on_settings_changed(changes);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Forwards change sets to an async task
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<ChangeSet>,
}

impl ChannelObserver {
    pub fn new(sender: mpsc::UnboundedSender<ChangeSet>) -> Self {
        Self { sender }
    }

    /// Observer plus the receiving end of its channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ChangeSet>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl Observer for ChannelObserver {
    fn on_settings_changed(&mut self, changes: &ChangeSet) {
        if self.sender.send(changes.clone()).is_err() {
            warn!("Settings change receiver closed, dropping notification");
        }
    }
}
