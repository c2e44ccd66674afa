//! CLI error handling with user-friendly messages.

use std::path::PathBuf;
use std::process;

use maestro::MaestroError;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging.
    LoggingInit(std::io::Error),
    /// Configuration file already exists and `--force` was not given.
    AlreadyExists(PathBuf),
    /// Failed to read or write a configuration file.
    ConfigIo { path: PathBuf, error: std::io::Error },
    /// Configuration file failed to parse.
    ConfigParse { path: PathBuf, error: serde_json::Error },
    /// An orchestrator operation failed.
    Maestro(MaestroError),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoggingInit(e) => write!(f, "failed to initialize logging: {e}"),
            Self::AlreadyExists(path) => write!(
                f,
                "{} already exists (pass --force to overwrite)",
                path.display()
            ),
            Self::ConfigIo { path, error } => {
                write!(f, "failed to access {}: {error}", path.display())
            }
            Self::ConfigParse { path, error } => {
                write!(f, "invalid configuration {}: {error}", path.display())
            }
            Self::Maestro(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<MaestroError> for CliError {
    fn from(e: MaestroError) -> Self {
        Self::Maestro(e)
    }
}

impl CliError {
    /// Exits the process with an error message and a non-zero code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {self}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_mentions_force() {
        let err = CliError::AlreadyExists(PathBuf::from("maestro.json"));
        assert!(err.to_string().contains("--force"));
    }

    #[test]
    fn test_config_parse_includes_path() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = CliError::ConfigParse {
            path: PathBuf::from("bad.json"),
            error: parse_err,
        };
        assert!(err.to_string().contains("bad.json"));
    }
}
