//! The configuration controller.
//!
//! [`Maestro`] is the top-level orchestrator: it converts a declarative
//! configuration document into live topology (factories, then entities,
//! then connections) on load, and converts live topology back into a
//! document on save. Construction goes through [`MaestroBuilder`].
//!
//! # Example
//!
//! ```ignore
//! use maestro::orchestrator::MaestroBuilder;
//! use maestro::factory::StaticFactoryLoader;
//!
//! let loader = StaticFactoryLoader::new()
//!     .with_emitter_export("sensor-pack", "PollingFactory", factory);
//!
//! let maestro = MaestroBuilder::from_path("maestro.json")
//!     .with_factory_loader(Arc::new(loader))
//!     .build();
//!
//! maestro.load().await?;
//! maestro.start().await?;
//! ```

mod builder;
mod controller;
mod error;

pub use builder::MaestroBuilder;
pub use controller::{ChroniclerInput, EmitterInput, Maestro};
pub use error::MaestroError;
