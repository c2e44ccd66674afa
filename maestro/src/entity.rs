//! Shared contracts for managed entities.
//!
//! Every emitter and chronicler managed by the orchestrator satisfies the
//! [`Entity`] trait: a stable identifier plus name and description, and a set
//! of *optional* capabilities discovered through accessor methods rather than
//! downcasting. Capabilities are probed exactly once when an entity enters a
//! registry and cached as a [`Capabilities`] record; lifecycle fan-outs
//! consult the cache instead of re-probing on every call.

use futures::future::BoxFuture;
use thiserror::Error;

/// Error reported by an entity operation (start, stop, persist, serialize).
///
/// Entities are external collaborators, so their failures surface as opaque
/// messages rather than a structured taxonomy.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EntityError {
    /// Human-readable failure description.
    pub message: String,
}

impl EntityError {
    /// Creates a new entity error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Base contract for anything a registry can manage.
///
/// The identifier is treated case-insensitively at every registry boundary;
/// implementations should return a stable value for the lifetime of the
/// entity. The capability accessors default to `None` — an entity opts into
/// a capability by overriding the accessor to return itself.
pub trait Entity: Send + Sync {
    /// Stable identifier, matched case-insensitively.
    fn id(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Start/stop capability, if this entity runs background work.
    fn as_service(&self) -> Option<&dyn Service> {
        None
    }

    /// Synchronous teardown capability.
    fn as_disposable(&self) -> Option<&dyn Disposable> {
        None
    }

    /// Asynchronous teardown capability.
    ///
    /// When both disposal forms are present the asynchronous one is
    /// preferred.
    fn as_disposable_async(&self) -> Option<&dyn DisposableAsync> {
        None
    }
}

/// Optional start/stop capability.
pub trait Service: Send + Sync {
    /// Starts background work (timers, pollers, listeners).
    fn start(&self) -> BoxFuture<'_, Result<(), EntityError>>;

    /// Stops background work. Must be safe to call when not started.
    fn stop(&self) -> BoxFuture<'_, Result<(), EntityError>>;
}

/// Optional synchronous teardown capability.
pub trait Disposable: Send + Sync {
    /// Releases held resources. Must be idempotent.
    fn dispose(&self);
}

/// Optional asynchronous teardown capability.
pub trait DisposableAsync: Send + Sync {
    /// Releases held resources, awaiting in-flight work. Must be idempotent.
    fn dispose_async(&self) -> BoxFuture<'_, ()>;
}

/// Which teardown form an entity supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposalKind {
    /// No teardown required.
    None,
    /// Synchronous [`Disposable`] only.
    Sync,
    /// Asynchronous [`DisposableAsync`] (preferred over sync when both exist).
    Async,
}

/// Capability record probed once at registration time.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    /// Entity supports [`Service`] start/stop.
    pub startable: bool,
    /// Which disposal form the entity supports.
    pub disposal: DisposalKind,
}

impl Capabilities {
    /// Probes an entity's optional capabilities.
    pub fn probe<T: Entity + ?Sized>(entity: &T) -> Self {
        let disposal = if entity.as_disposable_async().is_some() {
            DisposalKind::Async
        } else if entity.as_disposable().is_some() {
            DisposalKind::Sync
        } else {
            DisposalKind::None
        };
        Self {
            startable: entity.as_service().is_some(),
            disposal,
        }
    }
}

/// Tears an entity down according to its cached capability record.
pub(crate) async fn dispose_entity<T: Entity + ?Sized>(entity: &T, capabilities: Capabilities) {
    match capabilities.disposal {
        DisposalKind::Async => {
            if let Some(disposable) = entity.as_disposable_async() {
                disposable.dispose_async().await;
            }
        }
        DisposalKind::Sync => {
            if let Some(disposable) = entity.as_disposable() {
                disposable.dispose();
            }
        }
        DisposalKind::None => {}
    }
}
