use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Handle returned by [`CallbackRegistry::register`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackToken(u64);

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Token-keyed observer list.
///
/// Signalling snapshots the current observers before invoking them, so
/// registering or unregistering from inside a callback is safe and takes
/// effect on the next signal, not the in-flight one.
pub struct CallbackRegistry<E> {
    next_token: AtomicU64,
    entries: Mutex<Vec<(u64, Callback<E>)>>,
}

impl<E> Default for CallbackRegistry<E> {
    fn default() -> Self {
        Self {
            next_token: AtomicU64::new(0),
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<E> CallbackRegistry<E> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer and returns the token that identifies it.
    pub fn register(&self, callback: impl Fn(&E) + Send + Sync + 'static) -> CallbackToken {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().push((token, Arc::new(callback)));
        CallbackToken(token)
    }

    /// Unregisters an observer. Returns whether the token was known.
    pub fn unregister(&self, token: CallbackToken) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(t, _)| *t != token.0);
        entries.len() != before
    }

    /// Invokes every observer registered at the time of the call.
    pub fn signal(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = self
            .entries
            .lock()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in snapshot {
            callback(event);
        }
    }
}

impl<E> std::fmt::Debug for CallbackRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("observers", &self.entries.lock().len())
            .finish()
    }
}
