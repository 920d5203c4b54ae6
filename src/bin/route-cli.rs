use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use axum::body::Body;
use axum::http::Request;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tower::ServiceExt;

use trellis_router::config::{load_config, ConfigError, RouterConfig};
use trellis_router::http::build_router;
use trellis_router::routing::key::decode_path;
use trellis_router::routing::{RouteOutcome, RouterService};

#[derive(Parser)]
#[command(name = "route-cli")]
#[command(about = "Inspect a trellis-router configuration", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "router.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration
    Check,
    /// Show which route a request would reach
    Match {
        /// Request method, matched case-sensitively, e.g. GET
        method: String,
        /// Request path, e.g. /posts/42
        path: String,
    },
    /// Print the route tree
    Tree,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            match error.downcast_ref::<ConfigError>() {
                Some(ConfigError::Validation(errors)) => {
                    eprintln!("{}: {} problems", cli.config.display(), errors.len());
                    for error in errors {
                        eprintln!("  - {}", error);
                    }
                }
                _ => eprintln!("Error: {}", error),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let config = load_config(&cli.config)?;

    match &cli.command {
        Commands::Check => {
            build_router(&config)?;
            println!(
                "{}: {} routes OK",
                cli.config.display(),
                config.routes.len()
            );
        }
        Commands::Match { method, path } => {
            let report = match_report(&config, method, path).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Tree => {
            let router = build_router(&config)?;
            print!("{}", router.describe());
        }
    }

    Ok(())
}

/// Describe how the server would route `method` and `path`.
async fn match_report(config: &RouterConfig, method: &str, path: &str) -> Result<Value, Box<dyn Error>> {
    let service = build_router(config)?.into_service();
    let outcome = service.router().route(method, &decode_path(path));
    let report = match outcome {
        RouteOutcome::NotFound => json!({ "outcome": "not_found" }),
        RouteOutcome::MethodNotAllowed {
            pattern,
            params,
            methods,
        } => json!({
            "outcome": "method_not_allowed",
            "pattern": pattern,
            "params": params,
            "methods": methods,
        }),
        RouteOutcome::Matched(route) => json!({
            "outcome": "matched",
            "route": served_route_name(&service, method, path).await?,
            "pattern": route.pattern,
            "params": route.params,
            "methods": route.methods,
        }),
    };
    Ok(report)
}

/// Dispatch the request and read the route name from the configured
/// handler's response body.
async fn served_route_name(
    service: &RouterService,
    method: &str,
    path: &str,
) -> Result<Option<String>, Box<dyn Error>> {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())?;
    let response = match service.clone().oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body: Value = serde_json::from_slice(&bytes)?;
    Ok(body["route"].as_str().map(str::to_string))
}
