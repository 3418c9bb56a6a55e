//! InsightGrid HTTP Server
//!
//! Serves scenario simulations and dashboard data over HTTP/JSON, backed by
//! the in-memory provider.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use insightgrid::{
    build_router, AppState, Dataset, InMemoryProvider, ProjectionEngine, ServerConfig,
    SimulationRuntime,
};

fn print_help() {
    println!("insightgrid-server - InsightGrid scenario and dashboard API");
    println!();
    println!("USAGE:");
    println!("    insightgrid-server [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -b, --bind <ADDR>         Address to listen on [default: 127.0.0.1:8080]");
    println!("    -d, --data <FILE>         Dataset JSON file [default: empty dataset]");
    println!("    -h, --help                Print help information");
    println!();
    println!("ENVIRONMENT:");
    println!("    INSIGHTGRID_BIND, INSIGHTGRID_DATA, INSIGHTGRID_WORKERS,");
    println!("    INSIGHTGRID_QUEUE_CAPACITY, INSIGHTGRID_TIMEOUT_MS, INSIGHTGRID_LOG_JSON,");
    println!("    INSIGHTGRID_MAX_BODY_BYTES, RUST_LOG");
}

/// Applies command-line flags on top of the environment configuration.
fn parse_args(mut config: ServerConfig) -> ServerConfig {
    let args: Vec<String> = std::env::args().collect();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" | "-b" => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("error: --bind requires a value");
                    std::process::exit(1);
                };
                config.bind = value.parse::<SocketAddr>().unwrap_or_else(|_| {
                    eprintln!("error: invalid bind address: {value}");
                    std::process::exit(1);
                });
                i += 2;
            }
            "--data" | "-d" => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("error: --data requires a value");
                    std::process::exit(1);
                };
                config.data_path = Some(PathBuf::from(value));
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            arg => {
                eprintln!("error: unknown argument: {arg}");
                std::process::exit(1);
            }
        }
    }

    config
}

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                warn!("failed to register unix signal handlers; falling back to ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match ServerConfig::from_env() {
        Ok(config) => parse_args(config),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(config.log_json);

    let dataset = match &config.data_path {
        Some(path) => {
            let dataset = Dataset::from_path(path).map_err(|e| {
                error!(error = %e, "failed to load dataset");
                e
            })?;
            info!(
                path = %path.display(),
                shipments = dataset.shipments.len(),
                sales = dataset.sales.len(),
                finance = dataset.finance.len(),
                "dataset loaded"
            );
            dataset
        }
        None => {
            warn!("no dataset configured; serving empty aggregates");
            Dataset::default()
        }
    };

    let runtime = SimulationRuntime::new(
        ProjectionEngine::new(config.policy),
        Arc::new(InMemoryProvider::new(dataset)),
        config.runtime.clone(),
    )?;
    let state = AppState::new(Arc::new(runtime)).with_max_body_bytes(config.max_body_bytes);
    let app = build_router(state);

    let listener = TcpListener::bind(config.bind).await?;
    info!(
        addr = %config.bind,
        workers = config.runtime.workers,
        queue_capacity = config.runtime.queue_capacity,
        "insightgrid-server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            wait_for_shutdown_signal().await;
            info!("shutdown signal received; draining connections");
        })
        .await?;

    info!("server stopped");
    Ok(())
}
