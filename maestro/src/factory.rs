//! Entity factories: construction capabilities keyed by type tag.
//!
//! A [`FactoryRegistry`] maps type tags to factory instances, one table per
//! entity kind. It is owned by the orchestrator that uses it — two
//! orchestrators in the same process never share a factory namespace.
//! Declared factory descriptors are resolved to instances through a
//! [`FactoryLoader`]; [`StaticFactoryLoader`] is the in-process default,
//! holding the provider packages the embedding application registered.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use crate::chronicler::Chronicler;
use crate::config::{ChroniclerDescription, EmitterDescription, FactoryDescriptor, FormatSettings};
use crate::emitter::DataEmitter;

/// Factory resolution and construction errors.
#[derive(Debug, Error)]
pub enum FactoryError {
    /// No factory registered for a description's type tag.
    #[error("no {kind} factory registered for type '{type_tag}'")]
    FactoryNotFound {
        /// Entity kind ("emitter" or "chronicler").
        kind: &'static str,
        /// The unresolved type tag.
        type_tag: String,
    },

    /// The loader has no provider package under the descriptor's name.
    #[error("factory package '{package}' is not available")]
    PackageNotFound {
        /// The missing package name.
        package: String,
    },

    /// The provider package exists but does not export the named factory.
    #[error("package '{package}' does not export factory '{path}'")]
    ExportNotFound {
        /// The package that was found.
        package: String,
        /// The missing export.
        path: String,
    },

    /// A factory failed to construct an entity from its description.
    #[error("failed to construct {kind} '{entity_id}': {reason}")]
    ConstructionFailed {
        /// Entity kind ("emitter" or "chronicler").
        kind: &'static str,
        /// Identifier from the description.
        entity_id: String,
        /// Factory-reported failure.
        reason: String,
    },

    /// A factory failed to reconstitute an emitter from serialized state.
    #[error("failed to reconstitute emitter from serialized state: {0}")]
    RecreateFailed(String),
}

/// Builds emitters from declarative descriptions or serialized state.
pub trait EmitterFactory: Send + Sync {
    /// Builds an emitter from an inline description.
    fn build<'a>(
        &'a self,
        description: &'a EmitterDescription,
    ) -> BoxFuture<'a, Result<Arc<dyn DataEmitter>, FactoryError>>;

    /// Reconstitutes an emitter from previously serialized state.
    fn recreate<'a>(
        &'a self,
        state: &'a str,
        settings: &'a FormatSettings,
    ) -> BoxFuture<'a, Result<Arc<dyn DataEmitter>, FactoryError>>;
}

/// Builds chroniclers from declarative descriptions.
pub trait ChroniclerFactory: Send + Sync {
    /// Builds a chronicler from an inline description.
    fn build<'a>(
        &'a self,
        description: &'a ChroniclerDescription,
    ) -> BoxFuture<'a, Result<Arc<dyn Chronicler>, FactoryError>>;
}

/// Type-tag-to-factory tables, one per entity kind.
///
/// Registration is last-wins per tag and there is no teardown: factories
/// are expected to outlive every entity they build.
#[derive(Default)]
pub struct FactoryRegistry {
    emitter_factories: RwLock<HashMap<String, Arc<dyn EmitterFactory>>>,
    chronicler_factories: RwLock<HashMap<String, Arc<dyn ChroniclerFactory>>>,
}

impl FactoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an emitter factory under a type tag, replacing any previous
    /// registration for the same tag.
    pub fn register_emitter_factory(
        &self,
        type_tag: impl Into<String>,
        factory: Arc<dyn EmitterFactory>,
    ) {
        let type_tag = type_tag.into();
        debug!(type_tag = %type_tag, "Registering emitter factory");
        self.emitter_factories.write().insert(type_tag, factory);
    }

    /// Registers a chronicler factory under a type tag, replacing any
    /// previous registration for the same tag.
    pub fn register_chronicler_factory(
        &self,
        type_tag: impl Into<String>,
        factory: Arc<dyn ChroniclerFactory>,
    ) {
        let type_tag = type_tag.into();
        debug!(type_tag = %type_tag, "Registering chronicler factory");
        self.chronicler_factories.write().insert(type_tag, factory);
    }

    /// Number of registered emitter factories.
    pub fn emitter_factory_count(&self) -> usize {
        self.emitter_factories.read().len()
    }

    /// Number of registered chronicler factories.
    pub fn chronicler_factory_count(&self) -> usize {
        self.chronicler_factories.read().len()
    }

    /// Builds an emitter from an inline description.
    ///
    /// # Errors
    ///
    /// [`FactoryError::FactoryNotFound`] when no factory is registered for
    /// the description's type tag; construction failures otherwise.
    pub async fn build_emitter(
        &self,
        description: &EmitterDescription,
    ) -> Result<Arc<dyn DataEmitter>, FactoryError> {
        let factory = self.emitter_factory(&description.type_tag)?;
        factory.build(description).await
    }

    /// Reconstitutes an emitter from serialized state.
    ///
    /// The state's type tag is embedded in the serialized form, so the
    /// factory is resolved by the reconstituting package; all registered
    /// emitter factories are offered the state until one claims it.
    pub async fn recreate_emitter(
        &self,
        state: &str,
        settings: &FormatSettings,
    ) -> Result<Arc<dyn DataEmitter>, FactoryError> {
        let factories: Vec<Arc<dyn EmitterFactory>> =
            self.emitter_factories.read().values().cloned().collect();
        let mut last_error = FactoryError::RecreateFailed(
            "no emitter factories registered".to_string(),
        );
        for factory in factories {
            match factory.recreate(state, settings).await {
                Ok(emitter) => return Ok(emitter),
                Err(err) => last_error = err,
            }
        }
        Err(last_error)
    }

    /// Builds a chronicler from an inline description.
    ///
    /// # Errors
    ///
    /// [`FactoryError::FactoryNotFound`] when no factory is registered for
    /// the description's type tag; construction failures otherwise.
    pub async fn build_chronicler(
        &self,
        description: &ChroniclerDescription,
    ) -> Result<Arc<dyn Chronicler>, FactoryError> {
        let factory = {
            self.chronicler_factories
                .read()
                .get(&description.type_tag)
                .cloned()
                .ok_or_else(|| FactoryError::FactoryNotFound {
                    kind: "chronicler",
                    type_tag: description.type_tag.clone(),
                })?
        };
        factory.build(description).await
    }

    fn emitter_factory(&self, type_tag: &str) -> Result<Arc<dyn EmitterFactory>, FactoryError> {
        self.emitter_factories
            .read()
            .get(type_tag)
            .cloned()
            .ok_or_else(|| FactoryError::FactoryNotFound {
                kind: "emitter",
                type_tag: type_tag.to_string(),
            })
    }
}

/// Resolves declared factory descriptors to factory instances.
///
/// This is the seam where the source system loaded modules dynamically; in
/// Rust the embedding application supplies the packages up front and the
/// loader resolves descriptors against them. Resolution failures propagate
/// to the caller of `load()` unwrapped.
pub trait FactoryLoader: Send + Sync {
    /// Resolves an emitter factory descriptor.
    fn load_emitter_factory(
        &self,
        descriptor: &FactoryDescriptor,
    ) -> Result<Arc<dyn EmitterFactory>, FactoryError>;

    /// Resolves a chronicler factory descriptor.
    fn load_chronicler_factory(
        &self,
        descriptor: &FactoryDescriptor,
    ) -> Result<Arc<dyn ChroniclerFactory>, FactoryError>;
}

/// In-process [`FactoryLoader`] backed by registered provider packages.
#[derive(Default)]
pub struct StaticFactoryLoader {
    emitter_exports: HashMap<(String, String), Arc<dyn EmitterFactory>>,
    chronicler_exports: HashMap<(String, String), Arc<dyn ChroniclerFactory>>,
}

impl StaticFactoryLoader {
    /// Creates a loader with no packages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an emitter factory export under `package`/`path`.
    pub fn with_emitter_export(
        mut self,
        package: impl Into<String>,
        path: impl Into<String>,
        factory: Arc<dyn EmitterFactory>,
    ) -> Self {
        self.emitter_exports
            .insert((package.into(), path.into()), factory);
        self
    }

    /// Registers a chronicler factory export under `package`/`path`.
    pub fn with_chronicler_export(
        mut self,
        package: impl Into<String>,
        path: impl Into<String>,
        factory: Arc<dyn ChroniclerFactory>,
    ) -> Self {
        self.chronicler_exports
            .insert((package.into(), path.into()), factory);
        self
    }

    fn knows_package(&self, package: &str) -> bool {
        self.emitter_exports.keys().any(|(p, _)| p == package)
            || self.chronicler_exports.keys().any(|(p, _)| p == package)
    }
}

impl FactoryLoader for StaticFactoryLoader {
    fn load_emitter_factory(
        &self,
        descriptor: &FactoryDescriptor,
    ) -> Result<Arc<dyn EmitterFactory>, FactoryError> {
        let key = (
            descriptor.package_name.clone(),
            descriptor.factory_path.clone(),
        );
        if let Some(factory) = self.emitter_exports.get(&key) {
            return Ok(Arc::clone(factory));
        }
        if self.knows_package(&descriptor.package_name) {
            Err(FactoryError::ExportNotFound {
                package: descriptor.package_name.clone(),
                path: descriptor.factory_path.clone(),
            })
        } else {
            Err(FactoryError::PackageNotFound {
                package: descriptor.package_name.clone(),
            })
        }
    }

    fn load_chronicler_factory(
        &self,
        descriptor: &FactoryDescriptor,
    ) -> Result<Arc<dyn ChroniclerFactory>, FactoryError> {
        let key = (
            descriptor.package_name.clone(),
            descriptor.factory_path.clone(),
        );
        if let Some(factory) = self.chronicler_exports.get(&key) {
            return Ok(Arc::clone(factory));
        }
        if self.knows_package(&descriptor.package_name) {
            Err(FactoryError::ExportNotFound {
                package: descriptor.package_name.clone(),
                path: descriptor.factory_path.clone(),
            })
        } else {
            Err(FactoryError::PackageNotFound {
                package: descriptor.package_name.clone(),
            })
        }
    }
}
