use std::sync::Arc;

use parking_lot::RwLock;

use crate::device::{CallbackRegistry, CallbackToken, Controller};

/// Registry mutation event, delivered to registered observers.
#[derive(Clone)]
pub enum RegistryEvent {
    /// A controller joined the fleet.
    Added(Arc<Controller>),
    /// A controller left the fleet.
    Removed(Arc<Controller>),
}

impl std::fmt::Debug for RegistryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryEvent::Added(c) => write!(f, "Added({})", c.id()),
            RegistryEvent::Removed(c) => write!(f, "Removed({})", c.id()),
        }
    }
}

/// Process-wide ordered list of live controllers.
///
/// Lookup by index is the hot path and takes the reader side; registration
/// and removal are rare, serialized under the writer lock, and notify the
/// observers (the server rebroadcasts the change to its clients).
#[derive(Default)]
pub struct ControllerRegistry {
    controllers: RwLock<Vec<Arc<Controller>>>,
    observers: CallbackRegistry<RegistryEvent>,
}

impl ControllerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a controller and returns its index.
    pub fn register(&self, controller: Arc<Controller>) -> usize {
        let index = {
            let mut controllers = self.controllers.write();
            controllers.push(Arc::clone(&controller));
            controllers.len() - 1
        };
        tracing::debug!("Registered controller {} at index {index}", controller.id());
        self.observers.signal(&RegistryEvent::Added(controller));
        index
    }

    /// Removes a controller by identity. Indices of later controllers shift
    /// down; clients learn about it through the device list broadcast.
    pub fn deregister(&self, controller: &Arc<Controller>) -> bool {
        let removed = {
            let mut controllers = self.controllers.write();
            let before = controllers.len();
            controllers.retain(|c| c.id() != controller.id());
            controllers.len() != before
        };
        if removed {
            tracing::debug!("Deregistered controller {}", controller.id());
            self.observers
                .signal(&RegistryEvent::Removed(Arc::clone(controller)));
        }
        removed
    }

    /// Returns the controller at `index`.
    pub fn get(&self, index: usize) -> Option<Arc<Controller>> {
        self.controllers.read().get(index).cloned()
    }

    /// Number of registered controllers.
    pub fn len(&self) -> usize {
        self.controllers.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.controllers.read().is_empty()
    }

    /// Copy of the current controller list.
    pub fn snapshot(&self) -> Vec<Arc<Controller>> {
        self.controllers.read().clone()
    }

    /// Registers a mutation observer.
    pub fn observe(&self, callback: impl Fn(&RegistryEvent) + Send + Sync + 'static) -> CallbackToken {
        self.observers.register(callback)
    }

    /// Unregisters a mutation observer.
    pub fn unobserve(&self, token: CallbackToken) -> bool {
        self.observers.unregister(token)
    }
}
