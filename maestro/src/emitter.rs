//! Data emitter contract and event types.
//!
//! An emitter produces two broadcast streams: data events carrying payload
//! readings and status events describing connectivity. Subscribers obtain a
//! fresh `broadcast::Receiver` per call; the connection layer bridges those
//! receivers into chronicler persistence.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::FormatSettings;
use crate::entity::{Entity, EntityError};

/// A reading produced by an emitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataEvent {
    /// Identifier of the producing emitter.
    pub emitter_id: String,
    /// When the reading was taken.
    pub timestamp: DateTime<Utc>,
    /// Reading payload; shape is emitter-specific.
    pub payload: serde_json::Value,
}

/// A connectivity change reported by an emitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    /// Identifier of the reporting emitter.
    pub emitter_id: String,
    /// When the status changed.
    pub timestamp: DateTime<Utc>,
    /// Whether the emitter currently has its upstream source.
    pub connected: bool,
}

/// A data producer managed by the orchestrator.
///
/// Emitters must serialize their own state for persistence; service and
/// disposal capabilities are optional and discovered through the [`Entity`]
/// accessors.
pub trait DataEmitter: Entity {
    /// Subscribes to the data event stream.
    fn subscribe_data(&self) -> broadcast::Receiver<DataEvent>;

    /// Subscribes to the status event stream.
    fn subscribe_status(&self) -> broadcast::Receiver<StatusEvent>;

    /// Serializes this emitter's state for the configuration document.
    fn serialize_state(
        &self,
        settings: FormatSettings,
    ) -> BoxFuture<'_, Result<String, EntityError>>;
}
