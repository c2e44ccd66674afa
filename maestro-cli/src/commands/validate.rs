//! `maestro validate` - parse a configuration file and report its shape.

use std::path::Path;

use maestro::config::{read_document, ConfigError, MaestroDocument};

use crate::error::CliError;

/// Parses the configuration at `path` and prints a topology summary.
pub fn execute(path: &Path) -> Result<(), CliError> {
    let document = read_document(path).map_err(|err| match err {
        ConfigError::Io(error) => CliError::ConfigIo {
            path: path.to_path_buf(),
            error,
        },
        ConfigError::Parse(error) => CliError::ConfigParse {
            path: path.to_path_buf(),
            error,
        },
        other => CliError::Maestro(other.into()),
    })?;

    print_summary(path, &document);
    Ok(())
}

fn print_summary(path: &Path, document: &MaestroDocument) {
    println!("{} is valid", path.display());
    println!("  id:          {}", document.id);
    println!("  name:        {}", document.name);
    println!(
        "  factories:   {} emitter, {} chronicler",
        document.factories.emitter.len(),
        document.factories.chronicler.len()
    );
    println!("  emitters:    {}", document.emitters.len());
    println!("  chroniclers: {}", document.chroniclers.len());
    println!("  connections: {}", document.connections.len());
}
