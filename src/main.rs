#![forbid(unsafe_code)]

//! `command-relay` — live command relay server binary.
//!
//! Loads configuration, binds the relay listener, and serves producers and
//! the single consumer until SIGINT/SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

use command_relay::config::RelayConfig;
use command_relay::demo::spawn_demo_producer;
use command_relay::relay::{RelayContext, RelayListener};
use command_relay::{AppError, Result, DEFAULT_LOG_FILTER};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "command-relay", about = "Live command relay server", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listening port; overrides the config file and environment.
    #[arg(long)]
    port: Option<u16>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("command-relay bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = match args.config {
        Some(ref path) => RelayConfig::load_from_path(path)?,
        None => RelayConfig::default(),
    };
    config.apply_env_overrides()?;
    if let Some(port) = args.port {
        config.port = port;
    }
    info!(
        port = config.port,
        queue_capacity = config.queue_capacity,
        "configuration loaded"
    );

    // ── Bind listener (fatal on failure) ────────────────
    let listener = RelayListener::bind(config.listen_addr()?)
        .await
        .map_err(|err| {
            error!(%err, "error while creating server socket");
            err
        })?;
    info!(addr = %listener.local_addr(), "relay listening");

    let ctx = Arc::new(RelayContext::from_config(&config));
    let ct = CancellationToken::new();

    let listener_handle = listener.spawn(Arc::clone(&ctx), ct.clone());

    let demo_handle = if config.demo.enabled {
        info!(
            commands = config.demo.commands.len(),
            interval_seconds = config.demo.interval_seconds,
            "demo producer started"
        );
        Some(spawn_demo_producer(
            config.demo.clone(),
            ctx.queue.clone(),
            ct.clone(),
        ))
    } else {
        None
    };

    // ── Wait for shutdown signal ────────────────────────
    let signal = shutdown_signal().await;
    info!(signal, "shutdown signal received");
    ct.cancel();

    let _ = listener_handle.await;
    if let Some(handle) = demo_handle {
        let _ = handle.await;
    }
    info!(queued = ctx.queue.len(), "command-relay shut down");

    Ok(())
}

/// Wait for SIGINT or SIGTERM and name the one received.
async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                _ = tokio::signal::ctrl_c() => "SIGINT",
                _ = sigterm.recv() => "SIGTERM",
            },
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                wait_ctrl_c().await
            }
        }
    }

    #[cfg(not(unix))]
    {
        wait_ctrl_c().await
    }
}

async fn wait_ctrl_c() -> &'static str {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "ctrl-c handler failed; shutting down");
    }
    "SIGINT"
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // Closing a `relay_conn` or `consumer` span logs the connection's lifetime.
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_span_events(FmtSpan::CLOSE);

    let installed = match log_format {
        LogFormat::Text => subscriber.with_target(false).try_init(),
        LogFormat::Json => subscriber.json().with_current_span(true).try_init(),
    };
    installed.map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))
}
