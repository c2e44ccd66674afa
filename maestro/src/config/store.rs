//! Configuration source/sink handling.
//!
//! A [`ConfigStore`] abstracts where the declarative document lives: a JSON
//! file on disk, or a pair of caller-supplied async load/save handlers for
//! configuration held in some other store. Loading reads and parses the
//! whole file as UTF-8; saving serializes and overwrites, creating the
//! parent directory tree when absent.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;

use super::document::MaestroDocument;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither a file path nor a load handler was provided.
    #[error("no configuration file path or load handler provided")]
    SourceMissing,

    /// Neither a file path nor a save handler was provided.
    #[error("no configuration file path or save handler provided")]
    SinkMissing,

    /// File I/O failed.
    #[error("configuration I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The document failed to parse or serialize.
    #[error("invalid configuration document: {0}")]
    Parse(#[from] serde_json::Error),

    /// A caller-supplied handler failed.
    #[error("configuration handler failed: {0}")]
    Handler(String),
}

/// Async callback producing a configuration document.
pub type LoadHandler =
    Arc<dyn Fn() -> BoxFuture<'static, Result<MaestroDocument, ConfigError>> + Send + Sync>;

/// Async callback persisting a configuration document.
pub type SaveHandler =
    Arc<dyn Fn(MaestroDocument) -> BoxFuture<'static, Result<(), ConfigError>> + Send + Sync>;

/// Where configuration is read from and written to.
#[derive(Clone, Default)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    load_handler: Option<LoadHandler>,
    save_handler: Option<SaveHandler>,
}

impl ConfigStore {
    /// Store backed by a JSON file.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            load_handler: None,
            save_handler: None,
        }
    }

    /// Store backed by caller-supplied handlers. Either side may be absent;
    /// the corresponding operation then fails with
    /// [`ConfigError::SourceMissing`] / [`ConfigError::SinkMissing`].
    pub fn from_handlers(load: Option<LoadHandler>, save: Option<SaveHandler>) -> Self {
        Self {
            path: None,
            load_handler: load,
            save_handler: save,
        }
    }

    /// The backing file path, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether a load source is available.
    pub fn has_source(&self) -> bool {
        self.path.is_some() || self.load_handler.is_some()
    }

    /// Whether a save sink is available.
    pub fn has_sink(&self) -> bool {
        self.path.is_some() || self.save_handler.is_some()
    }

    /// Loads the document from the path or the load handler.
    pub async fn load(&self) -> Result<MaestroDocument, ConfigError> {
        if let Some(path) = &self.path {
            let text = tokio::fs::read_to_string(path).await?;
            return Ok(serde_json::from_str(&text)?);
        }
        if let Some(handler) = &self.load_handler {
            return handler().await;
        }
        Err(ConfigError::SourceMissing)
    }

    /// Saves the document to the path (creating parent directories) or the
    /// save handler.
    pub async fn save(&self, document: &MaestroDocument) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let text = serde_json::to_string_pretty(document)?;
            tokio::fs::write(path, text).await?;
            return Ok(());
        }
        if let Some(handler) = &self.save_handler {
            return handler(document.clone()).await;
        }
        Err(ConfigError::SinkMissing)
    }
}

/// Synchronously reads and parses a document from a file.
///
/// Used at orchestrator construction time, where a failure is downgraded to
/// the synthesized default document.
pub fn read_document(path: &Path) -> Result<MaestroDocument, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
