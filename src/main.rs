use std::path::Path;
use std::process::ExitCode;

use trellis_router::config::{load_config, RouterConfig};
use trellis_router::lifecycle;
use trellis_router::observability::logging::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match std::env::args().nth(1) {
        Some(path) => match load_config(Path::new(&path)) {
            Ok(config) => config,
            Err(error) => {
                eprintln!("Failed to load {}: {}", path, error);
                return ExitCode::FAILURE;
            }
        },
        None => RouterConfig::default(),
    };

    if let Err(error) = init_logging(&config.observability) {
        eprintln!("Failed to initialize logging: {}", error);
        return ExitCode::FAILURE;
    }

    tracing::info!("trellis-router v{} starting", env!("CARGO_PKG_VERSION"));

    match lifecycle::start(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %error, "Server failed");
            ExitCode::FAILURE
        }
    }
}
