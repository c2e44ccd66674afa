//! Declarative configuration document model.
//!
//! These types mirror the persisted JSON structure one-to-one: camelCase
//! field names on the wire, `connections` as lists of identifier pairs, and
//! entity configs whose `config` field is either an opaque serialized-state
//! string or an inline description object.

use serde::{Deserialize, Serialize};

/// Serialization format settings attached to the document and, optionally,
/// to individual entity configs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSettings {
    /// Whether serialized entity state is encrypted.
    #[serde(default)]
    pub encrypted: bool,
    /// Format discriminator (e.g. a cipher or codec name); `"N/A"` when the
    /// state is plain.
    #[serde(rename = "type", default = "FormatSettings::default_kind")]
    pub kind: String,
}

impl FormatSettings {
    fn default_kind() -> String {
        "N/A".to_string()
    }
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            encrypted: false,
            kind: Self::default_kind(),
        }
    }
}

/// Inline declarative description of an emitter to be built by a factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmitterDescription {
    /// Type tag resolved against the factory registry.
    #[serde(rename = "type")]
    pub type_tag: String,
    /// Identifier, matched case-insensitively.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Type-specific construction properties, passed through to the factory.
    #[serde(default)]
    pub properties: serde_json::Value,
}

/// Inline declarative description of a chronicler to be built by a factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChroniclerDescription {
    /// Type tag resolved against the factory registry.
    #[serde(rename = "type")]
    pub type_tag: String,
    /// Identifier, matched case-insensitively.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Type-specific construction properties, passed through to the factory.
    #[serde(default)]
    pub properties: serde_json::Value,
}

/// The `config` field of an emitter entry: either previously serialized
/// opaque state or an inline description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmitterConfigSource {
    /// Opaque serialized state to reconstitute through a factory.
    Serialized(String),
    /// Inline description to build through a factory.
    Inline(EmitterDescription),
}

/// The `config` field of a chronicler entry.
///
/// Reconstitution from serialized state is declared here for format
/// compatibility but rejected at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChroniclerConfigSource {
    /// Opaque serialized state (unsupported at load time).
    Serialized(String),
    /// Inline description to build through a factory.
    Inline(ChroniclerDescription),
}

/// One emitter entry in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmitterConfig {
    /// Serialized state or inline description.
    pub config: EmitterConfigSource,
    /// Per-entity format settings; falls back to the document settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_settings: Option<FormatSettings>,
}

/// One chronicler entry in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChroniclerConfig {
    /// Serialized state or inline description.
    pub config: ChroniclerConfigSource,
    /// Per-entity format settings; falls back to the document settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_settings: Option<FormatSettings>,
}

/// Reference to a factory exported by a provider package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryDescriptor {
    /// Provider package the factory lives in.
    pub package_name: String,
    /// Exported constructor within the package.
    pub factory_path: String,
    /// Type tag the factory is registered under.
    pub factory_type: String,
}

/// Factory descriptor lists, one per entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryMap {
    /// Emitter factory descriptors.
    #[serde(default)]
    pub emitter: Vec<FactoryDescriptor>,
    /// Chronicler factory descriptors.
    #[serde(default)]
    pub chronicler: Vec<FactoryDescriptor>,
}

/// One declared connection: every listed emitter is linked to every listed
/// chronicler. Identifiers that do not resolve at wiring time are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSpec {
    /// Emitter identifiers.
    #[serde(default)]
    pub emitters: Vec<String>,
    /// Chronicler identifiers.
    #[serde(default)]
    pub chroniclers: Vec<String>,
}

/// Root configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaestroDocument {
    /// Orchestrator identifier.
    pub id: String,
    /// Orchestrator display name.
    pub name: String,
    /// Orchestrator description.
    pub description: String,
    /// Default serialization settings for entity state.
    #[serde(default)]
    pub format_settings: FormatSettings,
    /// Declared factories.
    #[serde(default)]
    pub factories: FactoryMap,
    /// Declared emitters.
    #[serde(default)]
    pub emitters: Vec<EmitterConfig>,
    /// Declared chroniclers.
    #[serde(default)]
    pub chroniclers: Vec<ChroniclerConfig>,
    /// Declared connections. Always empty in saved documents.
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
}
