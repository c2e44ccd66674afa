//! Identifier-keyed registry of live entities.
//!
//! One registry instance exists per entity kind. The registry owns the
//! canonical handle for every entity it holds and governs the disposal
//! policy applied when an identifier is replaced or removed. Keys are
//! canonicalized to lowercase on every operation.

use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::entity::{dispose_entity, Capabilities, Entity};

/// A registered entity: the owning handle plus the capability record probed
/// when it was inserted.
pub struct RegisteredEntity<T: ?Sized> {
    /// The owning handle.
    pub handle: Arc<T>,
    /// Capabilities probed at registration.
    pub capabilities: Capabilities,
}

impl<T: ?Sized> Clone for RegisteredEntity<T> {
    fn clone(&self) -> Self {
        Self {
            handle: Arc::clone(&self.handle),
            capabilities: self.capabilities,
        }
    }
}

/// Registry of live entities keyed by lowercase identifier.
///
/// Iteration follows insertion order, though callers must not depend on
/// that for correctness.
pub struct EntityRegistry<T: Entity + ?Sized> {
    kind: &'static str,
    dispose_on_remove: bool,
    entries: Mutex<IndexMap<String, RegisteredEntity<T>>>,
}

impl<T: Entity + ?Sized> EntityRegistry<T> {
    /// Creates an empty registry.
    ///
    /// `kind` labels log lines ("emitter" / "chronicler");
    /// `dispose_on_remove` controls whether replaced or removed entities are
    /// torn down.
    pub fn new(kind: &'static str, dispose_on_remove: bool) -> Self {
        Self {
            kind,
            dispose_on_remove,
            entries: Mutex::new(IndexMap::new()),
        }
    }

    /// Adds a live entity, applying the replace policy when the identifier
    /// already exists: the previous handle is torn down (async disposal
    /// preferred) before the entry is overwritten.
    pub async fn add(&self, handle: Arc<T>) {
        let key = handle.id().to_lowercase();
        let capabilities = Capabilities::probe(handle.as_ref());
        debug!(kind = self.kind, id = %key, "Adding entity");

        let mut entries = self.entries.lock().await;
        if let Some(previous) = entries.get(&key) {
            warn!(kind = self.kind, id = %key, "Replacing existing entity");
            if self.dispose_on_remove {
                let previous = previous.clone();
                dispose_entity(previous.handle.as_ref(), previous.capabilities).await;
            }
        }
        entries.insert(
            key,
            RegisteredEntity {
                handle,
                capabilities,
            },
        );
    }

    /// Removes an entity by identifier; a no-op when absent. When the
    /// disposal policy is enabled the entity is torn down before removal.
    pub async fn remove(&self, id: &str) {
        let key = id.to_lowercase();
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get(&key) {
            if self.dispose_on_remove {
                let entry = entry.clone();
                dispose_entity(entry.handle.as_ref(), entry.capabilities).await;
            }
            entries.shift_remove(&key);
            debug!(kind = self.kind, id = %key, "Removed entity");
        }
    }

    /// Case-insensitive lookup.
    pub async fn get(&self, id: &str) -> Option<Arc<T>> {
        let key = id.to_lowercase();
        self.entries
            .lock()
            .await
            .get(&key)
            .map(|entry| Arc::clone(&entry.handle))
    }

    /// Snapshot of all handles in insertion order.
    pub async fn handles(&self) -> Vec<Arc<T>> {
        self.entries
            .lock()
            .await
            .values()
            .map(|entry| Arc::clone(&entry.handle))
            .collect()
    }

    /// Snapshot of all entries (handle + cached capabilities).
    pub async fn entries(&self) -> Vec<RegisteredEntity<T>> {
        self.entries.lock().await.values().cloned().collect()
    }

    /// Number of registered entities.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Removes and returns every entry without disposing them.
    ///
    /// Used by coordinated teardown, which disposes the drained entries
    /// itself.
    pub async fn drain(&self) -> Vec<RegisteredEntity<T>> {
        let mut entries = self.entries.lock().await;
        entries.drain(..).map(|(_, entry)| entry).collect()
    }
}
