//! Maestro - configuration-driven orchestration of data emitters and
//! chroniclers.
//!
//! This library wires a dynamic set of data producers ("emitters") to a
//! dynamic set of data consumers ("chroniclers") according to a declarative
//! JSON configuration, manages their lifecycle, and persists topology
//! changes back to durable configuration.
//!
//! # High-Level API
//!
//! ```ignore
//! use maestro::orchestrator::MaestroBuilder;
//!
//! let maestro = MaestroBuilder::from_path("maestro.json")
//!     .with_factory_loader(loader)
//!     .build();
//!
//! maestro.load().await?;
//! maestro.start().await?;
//! // ...
//! maestro.stop().await?;
//! maestro.save().await?;
//! maestro.dispose_async().await;
//! ```

pub mod chronicler;
pub mod config;
pub mod connection;
pub mod emitter;
pub mod entity;
pub mod factory;
pub mod lifecycle;
pub mod logging;
pub mod orchestrator;
pub mod registry;

pub use chronicler::{Chronicler, Record};
pub use config::{FormatSettings, MaestroDocument};
pub use emitter::{DataEmitter, DataEvent, StatusEvent};
pub use entity::{Capabilities, DisposalKind, Entity, EntityError};
pub use orchestrator::{Maestro, MaestroBuilder, MaestroError};

/// Version of the maestro library and CLI.
///
/// Synchronized across all components in the workspace; defined in
/// `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
