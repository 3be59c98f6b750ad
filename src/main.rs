//! task-pulse binary.
//!
//! - `serve` - HTTP and websocket endpoints over the Redis broker
//! - `worker` - Job worker pool over the Redis broker
//! - `standalone` - Both in one process with in-memory queue and fanout

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use task_pulse::application::{AppContext, StartupError};
use task_pulse::config::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "task-pulse", version, about = "Task-status notification service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Serve HTTP and websocket endpoints
    Serve,
    /// Execute queued jobs
    Worker,
    /// Serve and execute jobs in one process without a broker
    Standalone,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("task-pulse: {}", e);
            std::process::exit(2);
        }
    };
    init_tracing(&config);

    if let Err(e) = run(cli.command, config).await {
        tracing::error!(error = %e, "task-pulse exited with error");
        std::process::exit(1);
    }
}

fn load_config() -> Result<AppConfig, StartupError> {
    let config = AppConfig::load()?;
    config.validate()?;
    Ok(config)
}

/// `RUST_LOG` overrides `server.log_level`. JSON lines in production.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run(command: Command, config: AppConfig) -> Result<(), StartupError> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown requested"),
            Err(e) => tracing::error!(error = %e, "Cannot listen for Ctrl-C, shutting down"),
        }
        let _ = shutdown_tx.send(true);
    });

    match command {
        Command::Serve => {
            let context = AppContext::connect(config).await?;
            serve(&context, shutdown_rx).await
        }
        Command::Worker => {
            let context = AppContext::connect(config).await?;
            context.worker_pool().run(shutdown_rx).await;
            Ok(())
        }
        Command::Standalone => {
            let context = AppContext::in_memory(config)?;
            let pool = context.worker_pool();
            let (served, ()) = tokio::join!(
                serve(&context, shutdown_rx.clone()),
                pool.run(shutdown_rx)
            );
            served
        }
    }
}

async fn serve(context: &AppContext, mut shutdown: watch::Receiver<bool>) -> Result<(), StartupError> {
    let addr = context.config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?context.config.server.environment, "Listening");

    axum::serve(listener, context.http_router())
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
