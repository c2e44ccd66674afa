//! Orchestrator implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::try_join_all;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::error::MaestroError;
use crate::chronicler::Chronicler;
use crate::config::{
    ChroniclerConfig, ChroniclerConfigSource, ChroniclerDescription, ConfigStore, ConnectionSpec,
    EmitterConfig, EmitterConfigSource, EmitterDescription, FactoryMap, FormatSettings,
    MaestroDocument,
};
use crate::connection::{ConnectionHandle, ConnectionManager};
use crate::emitter::DataEmitter;
use crate::factory::{FactoryLoader, FactoryRegistry};
use crate::lifecycle::LifecycleCoordinator;
use crate::registry::EntityRegistry;

/// Input to [`Maestro::add_emitter`]: a live handle or an inline description
/// to resolve through the factory registry.
pub enum EmitterInput {
    /// An already-constructed emitter.
    Handle(Arc<dyn DataEmitter>),
    /// A description to build through a registered factory.
    Description(EmitterDescription),
}

impl From<Arc<dyn DataEmitter>> for EmitterInput {
    fn from(handle: Arc<dyn DataEmitter>) -> Self {
        Self::Handle(handle)
    }
}

impl From<EmitterDescription> for EmitterInput {
    fn from(description: EmitterDescription) -> Self {
        Self::Description(description)
    }
}

/// Input to [`Maestro::add_chronicler`].
pub enum ChroniclerInput {
    /// An already-constructed chronicler.
    Handle(Arc<dyn Chronicler>),
    /// A description to build through a registered factory.
    Description(ChroniclerDescription),
}

impl From<Arc<dyn Chronicler>> for ChroniclerInput {
    fn from(handle: Arc<dyn Chronicler>) -> Self {
        Self::Handle(handle)
    }
}

impl From<ChroniclerDescription> for ChroniclerInput {
    fn from(description: ChroniclerDescription) -> Self {
        Self::Description(description)
    }
}

/// The configuration controller.
///
/// Owns the factory registry, both entity registries, the connection
/// manager and the lifecycle coordinator. Mutating operations (`load`,
/// `save`, `add_*`, `remove_*`) are serialized through a single operation
/// lock per instance; the registries guard their own maps so lookups never
/// observe a torn state.
pub struct Maestro {
    factories: FactoryRegistry,
    loader: Arc<dyn FactoryLoader>,
    emitters: Arc<EntityRegistry<dyn DataEmitter>>,
    chroniclers: Arc<EntityRegistry<dyn Chronicler>>,
    connections: ConnectionManager,
    lifecycle: LifecycleCoordinator,
    store: ConfigStore,
    document: RwLock<MaestroDocument>,
    config_applied: AtomicBool,
    op_lock: Mutex<()>,
}

impl Maestro {
    pub(crate) fn new(
        store: ConfigStore,
        document: MaestroDocument,
        loader: Arc<dyn FactoryLoader>,
        dispose_on_remove: bool,
    ) -> Self {
        debug!(id = %document.id, "Creating maestro");
        let emitters: Arc<EntityRegistry<dyn DataEmitter>> =
            Arc::new(EntityRegistry::new("emitter", dispose_on_remove));
        let chroniclers: Arc<EntityRegistry<dyn Chronicler>> =
            Arc::new(EntityRegistry::new("chronicler", dispose_on_remove));
        let connections = ConnectionManager::new();
        let lifecycle = LifecycleCoordinator::new(
            Arc::clone(&emitters),
            Arc::clone(&chroniclers),
            connections.clone(),
        );
        Self {
            factories: FactoryRegistry::new(),
            loader,
            emitters,
            chroniclers,
            connections,
            lifecycle,
            store,
            document: RwLock::new(document),
            config_applied: AtomicBool::new(false),
            op_lock: Mutex::new(()),
        }
    }

    /// Orchestrator identifier from the current document snapshot.
    pub fn id(&self) -> String {
        self.document.read().id.clone()
    }

    /// Orchestrator name from the current document snapshot.
    pub fn name(&self) -> String {
        self.document.read().name.clone()
    }

    /// Orchestrator description from the current document snapshot.
    pub fn description(&self) -> String {
        self.document.read().description.clone()
    }

    /// Current default format settings.
    pub fn format_settings(&self) -> FormatSettings {
        self.document.read().format_settings.clone()
    }

    /// The factory registry owned by this orchestrator.
    pub fn factories(&self) -> &FactoryRegistry {
        &self.factories
    }

    /// Rebuilds live topology from the configuration source.
    ///
    /// Tears down the current topology, obtains the document from the file
    /// path or the load handler, registers declared factories, builds
    /// emitters then chroniclers, wires declared connections, and adopts the
    /// document as the current snapshot. Calling it again re-runs the full
    /// cycle.
    pub async fn load(&self) -> Result<(), MaestroError> {
        let _guard = self.op_lock.lock().await;
        self.lifecycle.dispose_async().await;

        let document = self.store.load().await?;
        self.apply_document(document).await?;
        self.config_applied.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Serializes live topology back into a document and writes it to the
    /// file path (creating parent directories) or the save handler.
    ///
    /// The saved document always carries an empty connection list; only
    /// declared topology from the load source is honored.
    pub async fn save(&self) -> Result<(), MaestroError> {
        let _guard = self.op_lock.lock().await;
        let document = self.build_document().await?;
        self.store.save(&document).await?;
        info!(id = %document.id, "Saved configuration");
        Ok(())
    }

    /// Starts every service-capable entity, loading the configuration first
    /// if it has not been applied yet.
    pub async fn start(&self) -> Result<(), MaestroError> {
        if !self.config_applied.load(Ordering::SeqCst) {
            self.load().await?;
        }
        self.lifecycle.start().await.map_err(MaestroError::from)
    }

    /// Stops every service-capable entity, loading the configuration first
    /// if it has not been applied yet.
    pub async fn stop(&self) -> Result<(), MaestroError> {
        if !self.config_applied.load(Ordering::SeqCst) {
            self.load().await?;
        }
        self.lifecycle.stop().await.map_err(MaestroError::from)
    }

    /// Tears down every entity and connection, leaving all registries and
    /// connection tracking empty. Terminal; safe to await a second time.
    pub async fn dispose_async(&self) {
        let _guard = self.op_lock.lock().await;
        self.lifecycle.dispose_async().await;
    }

    /// Adds an emitter from a live handle or an inline description.
    pub async fn add_emitter(
        &self,
        input: impl Into<EmitterInput>,
    ) -> Result<(), MaestroError> {
        let _guard = self.op_lock.lock().await;
        let handle = match input.into() {
            EmitterInput::Handle(handle) => handle,
            EmitterInput::Description(description) => {
                self.factories.build_emitter(&description).await?
            }
        };
        info!(emitter_id = %handle.id(), "Adding emitter");
        self.emitters.add(handle).await;
        Ok(())
    }

    /// Removes an emitter by identifier; a no-op when absent.
    pub async fn remove_emitter(&self, id: &str) {
        let _guard = self.op_lock.lock().await;
        self.emitters.remove(id).await;
    }

    /// Adds a chronicler from a live handle or an inline description.
    pub async fn add_chronicler(
        &self,
        input: impl Into<ChroniclerInput>,
    ) -> Result<(), MaestroError> {
        let _guard = self.op_lock.lock().await;
        let handle = match input.into() {
            ChroniclerInput::Handle(handle) => handle,
            ChroniclerInput::Description(description) => {
                self.factories.build_chronicler(&description).await?
            }
        };
        info!(chronicler_id = %handle.id(), "Adding chronicler");
        self.chroniclers.add(handle).await;
        Ok(())
    }

    /// Removes a chronicler by identifier; a no-op when absent.
    pub async fn remove_chronicler(&self, id: &str) {
        let _guard = self.op_lock.lock().await;
        self.chroniclers.remove(id).await;
    }

    /// Case-insensitive emitter lookup.
    pub async fn emitter(&self, id: &str) -> Option<Arc<dyn DataEmitter>> {
        self.emitters.get(id).await
    }

    /// Case-insensitive chronicler lookup.
    pub async fn chronicler(&self, id: &str) -> Option<Arc<dyn Chronicler>> {
        self.chroniclers.get(id).await
    }

    /// Snapshot of all emitters.
    pub async fn emitters(&self) -> Vec<Arc<dyn DataEmitter>> {
        self.emitters.handles().await
    }

    /// Snapshot of all chroniclers.
    pub async fn chroniclers(&self) -> Vec<Arc<dyn Chronicler>> {
        self.chroniclers.handles().await
    }

    /// Number of live emitters.
    pub async fn emitter_count(&self) -> usize {
        self.emitters.len().await
    }

    /// Number of live chroniclers.
    pub async fn chronicler_count(&self) -> usize {
        self.chroniclers.len().await
    }

    /// Number of outstanding connection handles.
    pub fn connection_count(&self) -> usize {
        self.connections.active_connections()
    }

    /// Links every given emitter to every given chronicler; the returned
    /// handle severs exactly those links.
    pub fn connect(
        &self,
        emitters: Vec<Arc<dyn DataEmitter>>,
        chroniclers: Vec<Arc<dyn Chronicler>>,
    ) -> Arc<ConnectionHandle> {
        self.connections.connect(emitters, chroniclers)
    }

    /// Makes the live topology match a document.
    async fn apply_document(&self, document: MaestroDocument) -> Result<(), MaestroError> {
        self.register_factories(&document.factories)?;
        self.create_emitters(&document.emitters, &document.format_settings)
            .await?;
        self.create_chroniclers(&document.chroniclers).await?;
        self.create_connections(&document.connections).await;
        *self.document.write() = document;
        Ok(())
    }

    fn register_factories(&self, factories: &FactoryMap) -> Result<(), MaestroError> {
        info!("Loading factories");
        let mut count = 0usize;
        for descriptor in &factories.emitter {
            info!(
                package = %descriptor.package_name,
                path = %descriptor.factory_path,
                type_tag = %descriptor.factory_type,
                "Registering emitter factory"
            );
            let factory = self.loader.load_emitter_factory(descriptor)?;
            self.factories
                .register_emitter_factory(&descriptor.factory_type, factory);
            count += 1;
        }
        for descriptor in &factories.chronicler {
            info!(
                package = %descriptor.package_name,
                path = %descriptor.factory_path,
                type_tag = %descriptor.factory_type,
                "Registering chronicler factory"
            );
            let factory = self.loader.load_chronicler_factory(descriptor)?;
            self.factories
                .register_chronicler_factory(&descriptor.factory_type, factory);
            count += 1;
        }
        info!(count, "Loaded factories");
        Ok(())
    }

    async fn create_emitters(
        &self,
        configs: &[EmitterConfig],
        defaults: &FormatSettings,
    ) -> Result<(), MaestroError> {
        info!("Loading emitters");
        let builds = configs.iter().map(|config| async move {
            match &config.config {
                EmitterConfigSource::Serialized(state) => {
                    let settings = config.format_settings.as_ref().unwrap_or(defaults);
                    self.factories
                        .recreate_emitter(state, settings)
                        .await
                        .map_err(MaestroError::from)
                }
                EmitterConfigSource::Inline(description) => self
                    .factories
                    .build_emitter(description)
                    .await
                    .map_err(MaestroError::from),
            }
        });
        let emitters = try_join_all(builds).await?;
        let count = emitters.len();
        for emitter in emitters {
            self.emitters.add(emitter).await;
        }
        info!(count, "Loaded emitters");
        Ok(())
    }

    async fn create_chroniclers(&self, configs: &[ChroniclerConfig]) -> Result<(), MaestroError> {
        info!("Loading chroniclers");
        let builds = configs.iter().map(|config| async move {
            match &config.config {
                ChroniclerConfigSource::Serialized(_) => Err(MaestroError::UnsupportedOperation(
                    "chronicler reconstitution from serialized state".to_string(),
                )),
                ChroniclerConfigSource::Inline(description) => self
                    .factories
                    .build_chronicler(description)
                    .await
                    .map_err(MaestroError::from),
            }
        });
        let chroniclers = try_join_all(builds).await?;
        let count = chroniclers.len();
        for chronicler in chroniclers {
            self.chroniclers.add(chronicler).await;
        }
        info!(count, "Loaded chroniclers");
        Ok(())
    }

    /// Wires declared connections, silently dropping identifiers that do
    /// not resolve to a live entity.
    async fn create_connections(&self, specs: &[ConnectionSpec]) {
        for spec in specs {
            let mut emitters = Vec::new();
            for id in &spec.emitters {
                match self.emitters.get(id).await {
                    Some(emitter) => emitters.push(emitter),
                    None => debug!(emitter_id = %id, "Dropping unresolved connection endpoint"),
                }
            }
            let mut chroniclers = Vec::new();
            for id in &spec.chroniclers {
                match self.chroniclers.get(id).await {
                    Some(chronicler) => chroniclers.push(chronicler),
                    None => {
                        debug!(chronicler_id = %id, "Dropping unresolved connection endpoint");
                    }
                }
            }
            self.connections.connect(emitters, chroniclers);
        }
    }

    /// Serializes live topology into a document using the current snapshot's
    /// metadata and factory lists.
    async fn build_document(&self) -> Result<MaestroDocument, MaestroError> {
        let snapshot = self.document.read().clone();
        let settings = snapshot.format_settings.clone();

        let emitter_handles = self.emitters.handles().await;
        let emitter_configs = try_join_all(emitter_handles.iter().map(|emitter| {
            let settings = settings.clone();
            async move {
                let state = emitter.serialize_state(settings.clone()).await?;
                Ok::<EmitterConfig, MaestroError>(EmitterConfig {
                    config: EmitterConfigSource::Serialized(state),
                    format_settings: Some(settings),
                })
            }
        }))
        .await?;

        let chronicler_handles = self.chroniclers.handles().await;
        let chronicler_configs = try_join_all(chronicler_handles.iter().map(|chronicler| {
            let settings = settings.clone();
            async move {
                let state = chronicler.serialize_state(settings.clone()).await?;
                Ok::<ChroniclerConfig, MaestroError>(ChroniclerConfig {
                    config: ChroniclerConfigSource::Serialized(state),
                    format_settings: Some(settings),
                })
            }
        }))
        .await?;

        Ok(MaestroDocument {
            id: snapshot.id,
            name: snapshot.name,
            description: snapshot.description,
            format_settings: snapshot.format_settings,
            factories: snapshot.factories,
            emitters: emitter_configs,
            chroniclers: chronicler_configs,
            connections: Vec::new(),
        })
    }
}
