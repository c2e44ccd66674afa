//! Synthesized fallback document.

use uuid::Uuid;

use super::document::{FactoryMap, FormatSettings, MaestroDocument};

/// Builds a minimal default document with a freshly generated identifier.
///
/// Used when the orchestrator is constructed from a file path whose content
/// is missing or unparsable: construction stays infallible and the hard
/// failure is deferred to an explicit `load()`.
pub fn synthesized_document() -> MaestroDocument {
    let id = Uuid::new_v4().to_string();
    MaestroDocument {
        name: format!("{id}-default-name"),
        description: format!("{id}-default-desc"),
        id,
        format_settings: FormatSettings::default(),
        factories: FactoryMap::default(),
        emitters: Vec::new(),
        chroniclers: Vec::new(),
        connections: Vec::new(),
    }
}
