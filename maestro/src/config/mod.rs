//! Declarative configuration: document model, defaults, and persistence.
//!
//! The document model in [`document`] mirrors the persisted JSON structure,
//! [`defaults`] synthesizes the fallback document used when a config file is
//! missing or corrupt at construction time, and [`store`] handles the
//! file-path and callback load/save modes.

mod defaults;
mod document;
mod store;

pub use defaults::synthesized_document;
pub use document::{
    ChroniclerConfig, ChroniclerConfigSource, ChroniclerDescription, ConnectionSpec,
    EmitterConfig, EmitterConfigSource, EmitterDescription, FactoryDescriptor, FactoryMap,
    FormatSettings, MaestroDocument,
};
pub use store::{read_document, ConfigError, ConfigStore, LoadHandler, SaveHandler};
