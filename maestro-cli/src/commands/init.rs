//! `maestro init` - write a starter configuration file.

use std::path::Path;

use maestro::config::synthesized_document;
use tracing::info;

use crate::error::CliError;

/// Writes a minimal default configuration document to `path`.
///
/// Refuses to overwrite an existing file unless `force` is set.
pub fn execute(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::AlreadyExists(path.to_path_buf()));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|error| CliError::ConfigIo {
            path: path.to_path_buf(),
            error,
        })?;
    }

    let document = synthesized_document();
    let text = serde_json::to_string_pretty(&document).map_err(|error| CliError::ConfigParse {
        path: path.to_path_buf(),
        error,
    })?;
    std::fs::write(path, text).map_err(|error| CliError::ConfigIo {
        path: path.to_path_buf(),
        error,
    })?;

    info!(path = %path.display(), id = %document.id, "Wrote starter configuration");
    println!("Created {}", path.display());
    Ok(())
}
