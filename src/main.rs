//! herakles-telemetry-agent - version 0.1.0
//!
//! Host telemetry agent with tracing logging.
//! This is the main entry point that schedules the collectors, serves their
//! latest samples over HTTP and handles subcommands.

mod cli;
mod collectors;
mod commands;
mod config;
mod handlers;
mod sample;
mod state;
mod system;
mod telemetry;

use axum::{routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use herakles_telemetry_agent::Scheduler;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};

use cli::{Args, Commands};
use commands::{command_collect, command_config};
use config::{
    resolve_config, show_config, validate_effective_config, Config, DEFAULT_BIND_ADDR, DEFAULT_PORT,
};
use handlers::{
    config_handler, health_handler, list_handler, metric_handler, root_handler, telemetry_handler,
};
use sample::build_registry;
use state::{AppState, SharedState};
use telemetry::AgentTelemetry;

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(config: &Config) {
    let log_level = match config.log_level.as_deref().unwrap_or("info") {
        "off" | "error" => Level::ERROR,
        "warn" => Level::WARN,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    info!("Logging initialized with level: {}", log_level);
}

/// Resolves once SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, &args.config_format);
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        let config = resolve_config(&args)?;
        return match command {
            Commands::Config {
                output,
                format,
                commented,
            } => command_config(output.clone(), format.clone(), *commented),
            Commands::Collect { key, format } => {
                command_collect(key.clone(), format.clone(), &config)
            }
        };
    }

    // Load configuration for main server mode
    let config = resolve_config(&args)?;

    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }

    setup_logging(&config);

    info!("Starting herakles-telemetry-agent");

    let registry = match build_registry(&config) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("❌ Failed to register collectors: {}", e);
            std::process::exit(1);
        }
    };

    let scheduler = Arc::new(Scheduler::new(registry));
    let cancel = CancellationToken::new();
    scheduler.run(cancel.clone());
    info!("Scheduled {} collectors", scheduler.len());

    let state: SharedState = Arc::new(AppState {
        scheduler: Arc::clone(&scheduler),
        config: Arc::new(config.clone()),
        telemetry: AgentTelemetry::new()?,
        start_time: Instant::now(),
    });

    // Signals cancel the collectors and drain the HTTP server
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            cancel.cancel();
        });
    }

    let bind_ip_str = config.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
    let port = config.port.unwrap_or(DEFAULT_PORT);
    let addr: SocketAddr = format!("{}:{}", bind_ip_str, port).parse()?;

    // Configure HTTP server routes
    let mut app = Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(list_handler))
        .route("/metrics/{key}", get(metric_handler))
        .route("/config", get(config_handler));

    if config.enable_health.unwrap_or(true) {
        app = app.route("/health", get(health_handler));
    }
    if config.enable_telemetry.unwrap_or(true) {
        app = app.route("/telemetry", get(telemetry_handler));
    }

    let app = app.with_state(state);

    let server_result: Result<(), Box<dyn std::error::Error>> =
        match (config.enable_tls.unwrap_or(false), &config.tls_cert_path, &config.tls_key_path) {
            (true, Some(cert_path), Some(key_path)) => {
                info!("Loading TLS certificate from: {}", cert_path);
                info!("Loading TLS private key from: {}", key_path);

                let tls_config = RustlsConfig::from_pem_file(cert_path, key_path)
                    .await
                    .map_err(|e| {
                        error!("Failed to load TLS configuration: {}", e);
                        e
                    })?;

                let handle = axum_server::Handle::new();
                {
                    let handle = handle.clone();
                    let cancel = cancel.clone();
                    let grace = config.shutdown_timeout();
                    tokio::spawn(async move {
                        cancel.cancelled().await;
                        handle.graceful_shutdown(Some(grace));
                    });
                }

                info!(
                    "herakles-telemetry-agent listening on https://{}:{}",
                    bind_ip_str, port
                );
                axum_server::bind_rustls(addr, tls_config)
                    .handle(handle)
                    .serve(app.into_make_service())
                    .await
                    .map_err(Into::into)
            }
            _ => {
                let listener = TcpListener::bind(addr).await?;
                info!(
                    "herakles-telemetry-agent listening on http://{}:{}",
                    bind_ip_str, port
                );
                axum::serve(listener, app)
                    .with_graceful_shutdown(cancel.clone().cancelled_owned())
                    .await
                    .map_err(Into::into)
            }
        };

    if let Err(e) = &server_result {
        error!("Server error: {}", e);
    }

    // The server may also stop on its own error; collectors follow it down
    cancel.cancel();
    let timeout = config.shutdown_timeout();
    if tokio::time::timeout(timeout, scheduler.wait()).await.is_err() {
        warn!(
            "Collectors did not stop within {}s, exiting anyway",
            timeout.as_secs()
        );
    }

    server_result?;
    info!("herakles-telemetry-agent stopped gracefully");
    Ok(())
}
