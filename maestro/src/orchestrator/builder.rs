//! Builder for [`Maestro`] instances.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, warn};

use super::controller::Maestro;
use crate::config::{
    read_document, synthesized_document, ConfigStore, LoadHandler, MaestroDocument, SaveHandler,
};
use crate::factory::{FactoryLoader, StaticFactoryLoader};

/// Builds a [`Maestro`] from a configuration file path or an in-memory
/// document, with optional load/save handlers and an injected factory
/// loader.
///
/// Construction never fails: a path whose file is missing or unparsable
/// falls back to a synthesized default document, deferring the hard failure
/// to an explicit `load()` call.
pub struct MaestroBuilder {
    config_path: Option<PathBuf>,
    document: Option<MaestroDocument>,
    load_handler: Option<LoadHandler>,
    save_handler: Option<SaveHandler>,
    factory_loader: Option<Arc<dyn FactoryLoader>>,
    dispose_on_remove: bool,
}

impl MaestroBuilder {
    /// Configuration backed by a JSON file.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: Some(path.into()),
            document: None,
            load_handler: None,
            save_handler: None,
            factory_loader: None,
            dispose_on_remove: true,
        }
    }

    /// Configuration supplied as an in-memory document. Load/save operate
    /// through handlers, which should be provided via
    /// [`with_load_handler`](Self::with_load_handler) /
    /// [`with_save_handler`](Self::with_save_handler).
    pub fn from_document(document: MaestroDocument) -> Self {
        Self {
            config_path: None,
            document: Some(document),
            load_handler: None,
            save_handler: None,
            factory_loader: None,
            dispose_on_remove: true,
        }
    }

    /// Sets the async callback used by `load()` when no file path is
    /// configured.
    pub fn with_load_handler(mut self, handler: LoadHandler) -> Self {
        self.load_handler = Some(handler);
        self
    }

    /// Sets the async callback used by `save()` when no file path is
    /// configured.
    pub fn with_save_handler(mut self, handler: SaveHandler) -> Self {
        self.save_handler = Some(handler);
        self
    }

    /// Injects the loader that resolves declared factory descriptors.
    /// Defaults to an empty [`StaticFactoryLoader`].
    pub fn with_factory_loader(mut self, loader: Arc<dyn FactoryLoader>) -> Self {
        self.factory_loader = Some(loader);
        self
    }

    /// Controls whether replaced or removed entities are torn down.
    /// Defaults to `true`.
    pub fn with_dispose_on_remove(mut self, dispose: bool) -> Self {
        self.dispose_on_remove = dispose;
        self
    }

    /// Builds the orchestrator.
    pub fn build(self) -> Maestro {
        let (store, document) = match self.config_path {
            Some(path) => {
                let document = match read_document(&path) {
                    Ok(document) => document,
                    Err(err) => {
                        error!(
                            path = %path.display(),
                            error = %err,
                            "Failed to load configuration, falling back to synthesized default"
                        );
                        synthesized_document()
                    }
                };
                (ConfigStore::from_path(path), document)
            }
            None => {
                if self.load_handler.is_none() {
                    warn!(
                        "Configuration supplied as an in-memory document without a load handler; \
                         load() will not be able to refresh state"
                    );
                }
                if self.save_handler.is_none() {
                    warn!(
                        "Configuration supplied as an in-memory document without a save handler; \
                         save() will not be able to persist state"
                    );
                }
                let store = ConfigStore::from_handlers(self.load_handler, self.save_handler);
                let document = self.document.unwrap_or_else(synthesized_document);
                (store, document)
            }
        };

        let loader = self
            .factory_loader
            .unwrap_or_else(|| Arc::new(StaticFactoryLoader::new()));

        Maestro::new(store, document, loader, self.dispose_on_remove)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_from_missing_file_synthesizes_default() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.json");

        let maestro = MaestroBuilder::from_path(&path).build();

        assert!(maestro.name().ends_with("-default-name"));
        assert!(maestro.description().ends_with("-default-desc"));
    }

    #[test]
    fn test_build_from_corrupt_file_synthesizes_default() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("corrupt.json");
        std::fs::write(&path, "{ this is not json").unwrap();

        let maestro = MaestroBuilder::from_path(&path).build();

        assert!(maestro.name().ends_with("-default-name"));
    }

    #[test]
    fn test_build_from_valid_file_adopts_metadata() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("maestro.json");
        let mut document = synthesized_document();
        document.id = "m-42".to_string();
        document.name = "plant floor".to_string();
        document.description = "line sensors".to_string();
        std::fs::write(&path, serde_json::to_string(&document).unwrap()).unwrap();

        let maestro = MaestroBuilder::from_path(&path).build();

        assert_eq!(maestro.id(), "m-42");
        assert_eq!(maestro.name(), "plant floor");
        assert_eq!(maestro.description(), "line sensors");
    }

    #[test]
    fn test_build_from_document() {
        let mut document = synthesized_document();
        document.id = "in-memory".to_string();

        let maestro = MaestroBuilder::from_document(document).build();

        assert_eq!(maestro.id(), "in-memory");
    }
}
