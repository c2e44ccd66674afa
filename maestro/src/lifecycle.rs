//! Uniform lifecycle fan-out across registered entities and connections.
//!
//! The coordinator drives start/stop/teardown over both registries and the
//! connection manager without caring which entities support which
//! capabilities: entities without a service capability are successful
//! no-ops, and disposal uses whichever teardown form was cached at
//! registration.

use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use tracing::{debug, error};

use crate::chronicler::Chronicler;
use crate::connection::ConnectionManager;
use crate::emitter::DataEmitter;
use crate::entity::{dispose_entity, Entity, EntityError};
use crate::registry::{EntityRegistry, RegisteredEntity};

/// Drives start/stop/dispose across all registered entities and all active
/// connections.
pub struct LifecycleCoordinator {
    emitters: Arc<EntityRegistry<dyn DataEmitter>>,
    chroniclers: Arc<EntityRegistry<dyn Chronicler>>,
    connections: ConnectionManager,
}

impl LifecycleCoordinator {
    /// Creates a coordinator over the given registries and connection
    /// manager.
    pub fn new(
        emitters: Arc<EntityRegistry<dyn DataEmitter>>,
        chroniclers: Arc<EntityRegistry<dyn Chronicler>>,
        connections: ConnectionManager,
    ) -> Self {
        Self {
            emitters,
            chroniclers,
            connections,
        }
    }

    /// Starts every service-capable entity.
    ///
    /// All starts are issued concurrently and the call returns once all have
    /// settled. Individual failures never prevent other entities from
    /// starting; the first error is surfaced after completion.
    pub async fn start(&self) -> Result<(), EntityError> {
        self.service_call(true).await
    }

    /// Stops every service-capable entity; same settlement semantics as
    /// [`start`](Self::start).
    pub async fn stop(&self) -> Result<(), EntityError> {
        self.service_call(false).await
    }

    async fn service_call(&self, start: bool) -> Result<(), EntityError> {
        let operation = if start { "start" } else { "stop" };
        let mut calls: Vec<BoxFuture<'static, Result<(), EntityError>>> = Vec::new();

        for entry in self.emitters.entries().await {
            calls.push(service_entity(entry, start));
        }
        for entry in self.chroniclers.entries().await {
            calls.push(service_entity(entry, start));
        }

        debug!(operation, entities = calls.len(), "Lifecycle fan-out");
        let results = join_all(calls).await;

        let mut first_error = None;
        for result in results {
            if let Err(err) = result {
                error!(operation, error = %err, "Entity lifecycle call failed");
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Tears down every entity in both registries and every outstanding
    /// connection, then leaves all tracking empty.
    ///
    /// Startable entities are stopped before disposal; disposal prefers the
    /// asynchronous capability. Safe to await a second time: it finds
    /// everything already empty and does nothing.
    pub async fn dispose_async(&self) {
        let emitters = self.emitters.drain().await;
        let chroniclers = self.chroniclers.drain().await;
        debug!(
            emitters = emitters.len(),
            chroniclers = chroniclers.len(),
            connections = self.connections.active_connections(),
            "Tearing down topology"
        );

        self.connections.dispose_all();

        let mut teardowns: Vec<BoxFuture<'static, ()>> = Vec::new();
        for entry in emitters {
            teardowns.push(teardown_entity(entry));
        }
        for entry in chroniclers {
            teardowns.push(teardown_entity(entry));
        }
        let count = teardowns.len();
        join_all(teardowns).await;
        debug!(entities = count, "Teardown complete");
    }
}

fn service_entity<T: Entity + ?Sized + 'static>(
    entry: RegisteredEntity<T>,
    start: bool,
) -> BoxFuture<'static, Result<(), EntityError>> {
    Box::pin(async move {
        if !entry.capabilities.startable {
            return Ok(());
        }
        match entry.handle.as_service() {
            Some(service) => {
                if start {
                    service.start().await
                } else {
                    service.stop().await
                }
            }
            None => Ok(()),
        }
    })
}

fn teardown_entity<T: Entity + ?Sized + 'static>(
    entry: RegisteredEntity<T>,
) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        if entry.capabilities.startable {
            if let Some(service) = entry.handle.as_service() {
                if let Err(err) = service.stop().await {
                    error!(entity_id = %entry.handle.id(), error = %err, "Stop during teardown failed");
                }
            }
        }
        dispose_entity(entry.handle.as_ref(), entry.capabilities).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormatSettings;
    use crate::emitter::{DataEvent, StatusEvent};
    use crate::entity::{DisposableAsync, Service};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::broadcast;

    struct ServiceEmitter {
        id: String,
        running: AtomicBool,
        starts: AtomicUsize,
        stops: AtomicUsize,
        disposals: AtomicUsize,
        fail_start: bool,
        data_tx: broadcast::Sender<DataEvent>,
        status_tx: broadcast::Sender<StatusEvent>,
    }

    impl ServiceEmitter {
        fn new(id: &str, fail_start: bool) -> Arc<Self> {
            let (data_tx, _) = broadcast::channel(4);
            let (status_tx, _) = broadcast::channel(4);
            Arc::new(Self {
                id: id.to_string(),
                running: AtomicBool::new(false),
                starts: AtomicUsize::new(0),
                stops: AtomicUsize::new(0),
                disposals: AtomicUsize::new(0),
                fail_start,
                data_tx,
                status_tx,
            })
        }
    }

    impl Entity for ServiceEmitter {
        fn id(&self) -> &str {
            &self.id
        }
        fn name(&self) -> &str {
            &self.id
        }
        fn description(&self) -> &str {
            "service emitter"
        }
        fn as_service(&self) -> Option<&dyn Service> {
            Some(self)
        }
        fn as_disposable_async(&self) -> Option<&dyn DisposableAsync> {
            Some(self)
        }
    }

    impl Service for ServiceEmitter {
        fn start(&self) -> BoxFuture<'_, Result<(), EntityError>> {
            Box::pin(async {
                self.starts.fetch_add(1, Ordering::SeqCst);
                if self.fail_start {
                    return Err(EntityError::new("start refused"));
                }
                self.running.store(true, Ordering::SeqCst);
                Ok(())
            })
        }
        fn stop(&self) -> BoxFuture<'_, Result<(), EntityError>> {
            Box::pin(async {
                self.stops.fetch_add(1, Ordering::SeqCst);
                self.running.store(false, Ordering::SeqCst);
                Ok(())
            })
        }
    }

    impl DisposableAsync for ServiceEmitter {
        fn dispose_async(&self) -> BoxFuture<'_, ()> {
            Box::pin(async {
                self.disposals.fetch_add(1, Ordering::SeqCst);
            })
        }
    }

    impl DataEmitter for ServiceEmitter {
        fn subscribe_data(&self) -> broadcast::Receiver<DataEvent> {
            self.data_tx.subscribe()
        }
        fn subscribe_status(&self) -> broadcast::Receiver<StatusEvent> {
            self.status_tx.subscribe()
        }
        fn serialize_state(
            &self,
            _settings: FormatSettings,
        ) -> BoxFuture<'_, Result<String, EntityError>> {
            Box::pin(async { Ok("{}".to_string()) })
        }
    }

    struct PlainChronicler {
        id: String,
    }

    impl PlainChronicler {
        fn new(id: &str) -> Arc<Self> {
            Arc::new(Self { id: id.to_string() })
        }
    }

    impl Entity for PlainChronicler {
        fn id(&self) -> &str {
            &self.id
        }
        fn name(&self) -> &str {
            &self.id
        }
        fn description(&self) -> &str {
            "no capabilities"
        }
    }

    impl Chronicler for PlainChronicler {
        fn save_record(&self, _record: crate::chronicler::Record) -> BoxFuture<'_, Result<(), EntityError>> {
            Box::pin(async { Ok(()) })
        }
        fn serialize_state(
            &self,
            _settings: FormatSettings,
        ) -> BoxFuture<'_, Result<String, EntityError>> {
            Box::pin(async { Ok("{}".to_string()) })
        }
    }

    fn coordinator() -> (
        LifecycleCoordinator,
        Arc<EntityRegistry<dyn DataEmitter>>,
        Arc<EntityRegistry<dyn Chronicler>>,
        ConnectionManager,
    ) {
        let emitters: Arc<EntityRegistry<dyn DataEmitter>> =
            Arc::new(EntityRegistry::new("emitter", true));
        let chroniclers: Arc<EntityRegistry<dyn Chronicler>> =
            Arc::new(EntityRegistry::new("chronicler", true));
        let connections = ConnectionManager::new();
        let coordinator = LifecycleCoordinator::new(
            Arc::clone(&emitters),
            Arc::clone(&chroniclers),
            connections.clone(),
        );
        (coordinator, emitters, chroniclers, connections)
    }

    #[tokio::test]
    async fn test_start_invokes_service_capable_entities_only() {
        let (coordinator, emitters, chroniclers, _) = coordinator();
        let emitter = ServiceEmitter::new("e1", false);
        emitters
            .add(Arc::clone(&emitter) as Arc<dyn DataEmitter>)
            .await;
        chroniclers
            .add(PlainChronicler::new("c1") as Arc<dyn Chronicler>)
            .await;

        coordinator.start().await.unwrap();

        assert_eq!(emitter.starts.load(Ordering::SeqCst), 1);
        assert!(emitter.running.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_others() {
        let (coordinator, emitters, _, _) = coordinator();
        let failing = ServiceEmitter::new("bad", true);
        let healthy = ServiceEmitter::new("good", false);
        emitters
            .add(Arc::clone(&failing) as Arc<dyn DataEmitter>)
            .await;
        emitters
            .add(Arc::clone(&healthy) as Arc<dyn DataEmitter>)
            .await;

        let result = coordinator.start().await;

        assert!(result.is_err());
        assert_eq!(failing.starts.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.starts.load(Ordering::SeqCst), 1);
        assert!(healthy.running.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_stop_after_start() {
        let (coordinator, emitters, _, _) = coordinator();
        let emitter = ServiceEmitter::new("e1", false);
        emitters
            .add(Arc::clone(&emitter) as Arc<dyn DataEmitter>)
            .await;

        coordinator.start().await.unwrap();
        coordinator.stop().await.unwrap();

        assert_eq!(emitter.stops.load(Ordering::SeqCst), 1);
        assert!(!emitter.running.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_dispose_clears_registries_and_connections() {
        let (coordinator, emitters, chroniclers, connections) = coordinator();
        let emitter = ServiceEmitter::new("e1", false);
        let chronicler = PlainChronicler::new("c1");
        emitters
            .add(Arc::clone(&emitter) as Arc<dyn DataEmitter>)
            .await;
        chroniclers
            .add(Arc::clone(&chronicler) as Arc<dyn Chronicler>)
            .await;
        connections.connect_one(
            Arc::clone(&emitter) as Arc<dyn DataEmitter>,
            Arc::clone(&chronicler) as Arc<dyn Chronicler>,
        );

        coordinator.dispose_async().await;

        assert!(emitters.is_empty().await);
        assert!(chroniclers.is_empty().await);
        assert_eq!(connections.active_connections(), 0);
        assert_eq!(emitter.disposals.load(Ordering::SeqCst), 1);
        assert_eq!(emitter.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispose_twice_has_no_further_effect() {
        let (coordinator, emitters, _, _) = coordinator();
        let emitter = ServiceEmitter::new("e1", false);
        emitters
            .add(Arc::clone(&emitter) as Arc<dyn DataEmitter>)
            .await;

        coordinator.dispose_async().await;
        coordinator.dispose_async().await;

        assert_eq!(emitter.disposals.load(Ordering::SeqCst), 1);
    }
}
