//! Data-flow links between emitters and chroniclers.
//!
//! A connection subscribes a chronicler's record persistence to an
//! emitter's data and status streams: two bridge tasks per
//! emitter/chronicler pair, each forwarding one stream. Connecting a set of
//! N emitters to a set of M chroniclers produces the full Cartesian product
//! (N×M links, 2×N×M bridge tasks) behind a single [`ConnectionHandle`]
//! whose `dispose()` severs exactly those links.
//!
//! The manager tracks every outstanding handle so a global teardown can
//! sever all of them without callers retaining references.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::chronicler::{Chronicler, Record};
use crate::emitter::DataEmitter;

/// Establishes and tracks emitter-to-chronicler links.
#[derive(Clone, Default)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

#[derive(Default)]
struct ManagerInner {
    connections: Mutex<HashMap<u64, Arc<ConnectionHandle>>>,
    next_id: AtomicU64,
}

impl ConnectionManager {
    /// Creates a manager with no connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Links every emitter to every chronicler and returns one disposable
    /// handle covering all created links.
    ///
    /// A single handle on either side is the one-element case; empty sides
    /// yield a degenerate handle with zero links. Must be called from within
    /// a Tokio runtime.
    pub fn connect<E, C>(&self, emitters: E, chroniclers: C) -> Arc<ConnectionHandle>
    where
        E: IntoIterator<Item = Arc<dyn DataEmitter>>,
        C: IntoIterator<Item = Arc<dyn Chronicler>>,
    {
        let chroniclers: Vec<Arc<dyn Chronicler>> = chroniclers.into_iter().collect();
        let cancellation = CancellationToken::new();
        let mut tasks = Vec::new();
        let mut link_count = 0usize;

        for emitter in emitters {
            for chronicler in &chroniclers {
                tasks.push(spawn_data_bridge(
                    &emitter,
                    Arc::clone(chronicler),
                    cancellation.clone(),
                ));
                tasks.push(spawn_status_bridge(
                    &emitter,
                    Arc::clone(chronicler),
                    cancellation.clone(),
                ));
                link_count += 1;
            }
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = Arc::new(ConnectionHandle {
            id,
            link_count,
            cancellation,
            tasks: Mutex::new(tasks),
            disposed: AtomicBool::new(false),
            manager: Arc::downgrade(&self.inner),
        });

        self.inner
            .connections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Arc::clone(&handle));
        debug!(connection_id = id, links = link_count, "Connection established");
        handle
    }

    /// Links one emitter to one chronicler.
    pub fn connect_one(
        &self,
        emitter: Arc<dyn DataEmitter>,
        chronicler: Arc<dyn Chronicler>,
    ) -> Arc<ConnectionHandle> {
        self.connect([emitter], [chronicler])
    }

    /// Number of outstanding connection handles.
    pub fn active_connections(&self) -> usize {
        self.inner
            .connections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Severs every outstanding connection.
    pub fn dispose_all(&self) {
        let handles: Vec<Arc<ConnectionHandle>> = {
            let mut connections = self
                .inner
                .connections
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            connections.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            handle.dispose();
        }
    }
}

/// Disposable handle aggregating the links created by one `connect` call.
pub struct ConnectionHandle {
    id: u64,
    link_count: usize,
    cancellation: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    disposed: AtomicBool,
    manager: Weak<ManagerInner>,
}

impl ConnectionHandle {
    /// Number of emitter/chronicler links behind this handle.
    pub fn link_count(&self) -> usize {
        self.link_count
    }

    /// Whether the handle has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Severs every link this handle covers and removes it from the
    /// manager's tracked set. A second call is a no-op.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancellation.cancel();
        let tasks: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            tasks.drain(..).collect()
        };
        for task in tasks {
            task.abort();
        }
        if let Some(manager) = self.manager.upgrade() {
            manager
                .connections
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&self.id);
        }
        debug!(connection_id = self.id, links = self.link_count, "Connection disposed");
    }
}

fn spawn_data_bridge(
    emitter: &Arc<dyn DataEmitter>,
    chronicler: Arc<dyn Chronicler>,
    cancellation: CancellationToken,
) -> JoinHandle<()> {
    let mut events = emitter.subscribe_data();
    let emitter_id = emitter.id().to_string();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => break,

                event = events.recv() => match event {
                    Ok(event) => {
                        if let Err(e) = chronicler.save_record(Record::Data(event)).await {
                            warn!(
                                emitter_id = %emitter_id,
                                chronicler_id = %chronicler.id(),
                                error = %e,
                                "Failed to persist data event"
                            );
                        }
                    }
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(skipped)) => {
                        trace!(emitter_id = %emitter_id, skipped, "Data bridge lagged");
                    }
                }
            }
        }
    })
}

fn spawn_status_bridge(
    emitter: &Arc<dyn DataEmitter>,
    chronicler: Arc<dyn Chronicler>,
    cancellation: CancellationToken,
) -> JoinHandle<()> {
    let mut events = emitter.subscribe_status();
    let emitter_id = emitter.id().to_string();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => break,

                event = events.recv() => match event {
                    Ok(event) => {
                        if let Err(e) = chronicler.save_record(Record::Status(event)).await {
                            warn!(
                                emitter_id = %emitter_id,
                                chronicler_id = %chronicler.id(),
                                error = %e,
                                "Failed to persist status event"
                            );
                        }
                    }
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(skipped)) => {
                        trace!(emitter_id = %emitter_id, skipped, "Status bridge lagged");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormatSettings;
    use crate::emitter::{DataEvent, StatusEvent};
    use crate::entity::{Entity, EntityError};
    use chrono::Utc;
    use futures::future::BoxFuture;
    use std::time::Duration;
    use tokio::sync::broadcast;

    struct TestEmitter {
        id: String,
        data_tx: broadcast::Sender<DataEvent>,
        status_tx: broadcast::Sender<StatusEvent>,
    }

    impl TestEmitter {
        fn new(id: &str) -> Arc<Self> {
            let (data_tx, _) = broadcast::channel(16);
            let (status_tx, _) = broadcast::channel(16);
            Arc::new(Self {
                id: id.to_string(),
                data_tx,
                status_tx,
            })
        }

        fn emit(&self, payload: serde_json::Value) {
            let _ = self.data_tx.send(DataEvent {
                emitter_id: self.id.clone(),
                timestamp: Utc::now(),
                payload,
            });
        }

        fn subscriptions(&self) -> usize {
            self.data_tx.receiver_count() + self.status_tx.receiver_count()
        }
    }

    impl Entity for TestEmitter {
        fn id(&self) -> &str {
            &self.id
        }
        fn name(&self) -> &str {
            &self.id
        }
        fn description(&self) -> &str {
            "test emitter"
        }
    }

    impl DataEmitter for TestEmitter {
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

    struct TestChronicler {
        id: String,
        records: Mutex<Vec<Record>>,
    }

    impl TestChronicler {
        fn new(id: &str) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                records: Mutex::new(Vec::new()),
            })
        }

        fn record_count(&self) -> usize {
            self.records.lock().unwrap().len()
        }
    }

    impl Entity for TestChronicler {
        fn id(&self) -> &str {
            &self.id
        }
        fn name(&self) -> &str {
            &self.id
        }
        fn description(&self) -> &str {
            "test chronicler"
        }
    }

    impl Chronicler for TestChronicler {
        fn save_record(&self, record: Record) -> BoxFuture<'_, Result<(), EntityError>> {
            Box::pin(async move {
                self.records.lock().unwrap().push(record);
                Ok(())
            })
        }
        fn serialize_state(
            &self,
            _settings: FormatSettings,
        ) -> BoxFuture<'_, Result<String, EntityError>> {
            Box::pin(async { Ok("{}".to_string()) })
        }
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        for _ in 0..100 {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        condition()
    }

    #[tokio::test]
    async fn test_single_pair_creates_two_subscriptions() {
        let manager = ConnectionManager::new();
        let emitter = TestEmitter::new("e1");
        let chronicler = TestChronicler::new("c1");

        let handle = manager.connect_one(
            Arc::clone(&emitter) as Arc<dyn DataEmitter>,
            Arc::clone(&chronicler) as Arc<dyn Chronicler>,
        );

        assert_eq!(handle.link_count(), 1);
        assert_eq!(emitter.data_tx.receiver_count(), 1);
        assert_eq!(emitter.status_tx.receiver_count(), 1);
    }

    #[tokio::test]
    async fn test_cartesian_product_link_count() {
        let manager = ConnectionManager::new();
        let emitters: Vec<Arc<TestEmitter>> =
            vec![TestEmitter::new("e1"), TestEmitter::new("e2")];
        let chroniclers: Vec<Arc<TestChronicler>> = vec![
            TestChronicler::new("c1"),
            TestChronicler::new("c2"),
            TestChronicler::new("c3"),
        ];

        let handle = manager.connect(
            emitters
                .iter()
                .map(|e| Arc::clone(e) as Arc<dyn DataEmitter>)
                .collect::<Vec<_>>(),
            chroniclers
                .iter()
                .map(|c| Arc::clone(c) as Arc<dyn Chronicler>)
                .collect::<Vec<_>>(),
        );

        assert_eq!(handle.link_count(), 6);
        for emitter in &emitters {
            assert_eq!(emitter.subscriptions(), 6);
        }
    }

    #[tokio::test]
    async fn test_records_flow_from_emitter_to_chronicler() {
        let manager = ConnectionManager::new();
        let emitter = TestEmitter::new("e1");
        let chronicler = TestChronicler::new("c1");

        let _handle = manager.connect_one(
            Arc::clone(&emitter) as Arc<dyn DataEmitter>,
            Arc::clone(&chronicler) as Arc<dyn Chronicler>,
        );

        emitter.emit(serde_json::json!({ "reading": 1 }));
        emitter.emit(serde_json::json!({ "reading": 2 }));

        assert!(wait_until(|| chronicler.record_count() == 2).await);
    }

    #[tokio::test]
    async fn test_dispose_severs_all_links() {
        let manager = ConnectionManager::new();
        let emitter = TestEmitter::new("e1");
        let chroniclers: Vec<Arc<TestChronicler>> =
            vec![TestChronicler::new("c1"), TestChronicler::new("c2")];

        let handle = manager.connect(
            [Arc::clone(&emitter) as Arc<dyn DataEmitter>],
            chroniclers
                .iter()
                .map(|c| Arc::clone(c) as Arc<dyn Chronicler>)
                .collect::<Vec<_>>(),
        );
        assert_eq!(emitter.subscriptions(), 4);

        handle.dispose();

        assert!(wait_until(|| emitter.subscriptions() == 0).await);
        assert_eq!(manager.active_connections(), 0);
    }

    #[tokio::test]
    async fn test_double_dispose_is_noop() {
        let manager = ConnectionManager::new();
        let emitter = TestEmitter::new("e1");
        let chronicler = TestChronicler::new("c1");

        let handle = manager.connect_one(
            Arc::clone(&emitter) as Arc<dyn DataEmitter>,
            Arc::clone(&chronicler) as Arc<dyn Chronicler>,
        );

        handle.dispose();
        handle.dispose();

        assert!(handle.is_disposed());
        assert_eq!(manager.active_connections(), 0);
    }

    #[tokio::test]
    async fn test_dispose_all_severs_every_connection() {
        let manager = ConnectionManager::new();
        let emitter = TestEmitter::new("e1");
        let chronicler = TestChronicler::new("c1");

        let first = manager.connect_one(
            Arc::clone(&emitter) as Arc<dyn DataEmitter>,
            Arc::clone(&chronicler) as Arc<dyn Chronicler>,
        );
        let second = manager.connect_one(
            Arc::clone(&emitter) as Arc<dyn DataEmitter>,
            Arc::clone(&chronicler) as Arc<dyn Chronicler>,
        );
        assert_eq!(manager.active_connections(), 2);

        manager.dispose_all();

        assert!(first.is_disposed());
        assert!(second.is_disposed());
        assert_eq!(manager.active_connections(), 0);
        assert!(wait_until(|| emitter.subscriptions() == 0).await);
    }

    #[tokio::test]
    async fn test_empty_side_yields_degenerate_connection() {
        let manager = ConnectionManager::new();
        let emitter = TestEmitter::new("e1");

        let handle = manager.connect(
            [Arc::clone(&emitter) as Arc<dyn DataEmitter>],
            Vec::<Arc<dyn Chronicler>>::new(),
        );

        assert_eq!(handle.link_count(), 0);
        assert_eq!(emitter.subscriptions(), 0);
        handle.dispose();
    }

    #[tokio::test]
    async fn test_disposed_connection_stops_delivery() {
        let manager = ConnectionManager::new();
        let emitter = TestEmitter::new("e1");
        let chronicler = TestChronicler::new("c1");

        let handle = manager.connect_one(
            Arc::clone(&emitter) as Arc<dyn DataEmitter>,
            Arc::clone(&chronicler) as Arc<dyn Chronicler>,
        );

        emitter.emit(serde_json::json!({ "reading": 1 }));
        assert!(wait_until(|| chronicler.record_count() == 1).await);

        handle.dispose();
        assert!(wait_until(|| emitter.subscriptions() == 0).await);

        emitter.emit(serde_json::json!({ "reading": 2 }));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(chronicler.record_count(), 1);
    }
}
