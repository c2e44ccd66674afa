//! Chronicler contract and the record type it persists.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::config::FormatSettings;
use crate::emitter::{DataEvent, StatusEvent};
use crate::entity::{Entity, EntityError};

/// A record delivered to a chronicler: either a data reading or a status
/// change from a connected emitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Record {
    /// A data reading.
    Data(DataEvent),
    /// A connectivity change.
    Status(StatusEvent),
}

impl Record {
    /// Identifier of the emitter that produced the underlying event.
    pub fn emitter_id(&self) -> &str {
        match self {
            Record::Data(event) => &event.emitter_id,
            Record::Status(event) => &event.emitter_id,
        }
    }
}

/// A durable consumer of emitter records.
pub trait Chronicler: Entity {
    /// Persists one record.
    fn save_record(&self, record: Record) -> BoxFuture<'_, Result<(), EntityError>>;

    /// Serializes this chronicler's state for the configuration document.
    fn serialize_state(
        &self,
        settings: FormatSettings,
    ) -> BoxFuture<'_, Result<String, EntityError>>;
}
