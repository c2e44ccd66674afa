//! `maestro run` - load a configuration and run the topology until
//! interrupted.

use std::path::Path;

use maestro::MaestroBuilder;
use tracing::{info, warn};

use crate::error::CliError;

/// Loads the configuration at `path`, starts every service-capable entity,
/// and runs until Ctrl-C. On shutdown the topology is stopped and torn
/// down; with `save_on_exit` the live state is written back first.
///
/// Factories referenced by the configuration must come from packages the
/// embedding build linked in; the stock CLI ships none, so `run` is only
/// useful for configurations without declared factories or as a template
/// for embedders.
pub async fn execute(path: &Path, save_on_exit: bool) -> Result<(), CliError> {
    let maestro = MaestroBuilder::from_path(path).build();

    maestro.load().await?;
    info!(
        id = %maestro.id(),
        emitters = maestro.emitter_count().await,
        chroniclers = maestro.chronicler_count().await,
        connections = maestro.connection_count(),
        "Topology loaded"
    );

    maestro.start().await?;
    info!("Running; press Ctrl-C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }

    info!("Shutting down");
    maestro.stop().await?;

    if save_on_exit {
        maestro.save().await?;
        info!(path = %path.display(), "Saved configuration");
    }

    maestro.dispose_async().await;
    Ok(())
}
