#![forbid(unsafe_code)]

//! `mcp-gateway` server binary.
//!
//! Loads the child registry, serves the gateway tools over stdio, and on
//! exit drains every child session before releasing the discarded-output
//! sink.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::{Parser, ValueEnum};
use rmcp::transport::io::stdio;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, EnvFilter};

use mcp_gateway::client::rmcp_client::RmcpClientFactory;
use mcp_gateway::client::sink::ErrorSink;
use mcp_gateway::client::ClientFactory;
use mcp_gateway::config::{validate_abstract_path, ChildRegistry, GatewayConfig, Timeouts};
use mcp_gateway::mcp::handler::{AppState, GatewayServer};
use mcp_gateway::orchestrator::session_manager::SessionManager;
use mcp_gateway::{AppError, Result};

/// Enables debug logging and forwards child stderr when set.
const DEBUG_ENV: &str = "DEBUG_MCP";

/// Additional log file destination.
const LOG_FILE_ENV: &str = "MCP_LOG_FILE";

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "mcp-gateway", about = "MCP gateway for on-demand child servers", version, long_about = None)]
struct Cli {
    /// Path to the children registry file (.json or .toml).
    #[arg(long)]
    children_config: PathBuf,

    /// Path to a .json file summarizing the child servers.
    #[arg(long)]
    children_abstract: Option<PathBuf>,

    /// Start every registered child at startup instead of on first use.
    #[arg(long)]
    prestart: bool,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> ExitCode {
    let args = Cli::parse();
    match bootstrap(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn bootstrap(args: Cli) -> Result<()> {
    let debug = env::var_os(DEBUG_ENV).is_some();
    init_tracing(args.log_format, debug, env::var(LOG_FILE_ENV).ok())?;
    info!("mcp-gateway bootstrap");

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args, debug))
}

async fn run(args: Cli, debug: bool) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let registry = ChildRegistry::load_from_path(&args.children_config)?;

    let children_abstract = match validate_abstract_path(args.children_abstract) {
        Ok(Some(path)) => Some(path),
        Ok(None) => {
            eprintln!(
                "Warning: --children-abstract not provided. \
                 The children_servers resource will be empty."
            );
            None
        }
        Err(err) => {
            eprintln!("Warning: {err}");
            None
        }
    };

    let config = Arc::new(GatewayConfig {
        registry,
        timeouts: Timeouts::default(),
        children_abstract,
        prestart: args.prestart,
        forward_child_stderr: debug,
    });
    info!(children = config.registry.len(), "configuration loaded");

    // ── Build shared state ──────────────────────────────
    let sink = Arc::new(ErrorSink::open(config.forward_child_stderr)?);
    let factory: Arc<dyn ClientFactory> = Arc::new(RmcpClientFactory::new(Arc::clone(&sink)));
    let manager = Arc::new(SessionManager::new(
        config.registry.clone(),
        factory,
        config.timeouts,
    ));
    let state = Arc::new(AppState::new(Arc::clone(&config), Arc::clone(&manager)));

    if config.prestart {
        let started = manager.start_all().await;
        info!(started, total = config.registry.len(), "prestart complete");
    }

    // ── Serve until the peer leaves or a signal arrives ─
    let ct = CancellationToken::new();
    let mut serve = tokio::spawn(GatewayServer::new(state).serve_host(stdio(), ct.clone()));
    info!("MCP gateway ready");

    tokio::select! {
        joined = &mut serve => log_serve_outcome(joined),
        () = shutdown_signal() => {
            info!("shutdown signal received");
            ct.cancel();
            log_serve_outcome(serve.await);
        }
    }

    // ── Drain children, then release the sink ──────────
    manager.shutdown_all().await;
    drop(manager);
    match Arc::try_unwrap(sink) {
        Ok(sink) => drop(sink),
        Err(_) => warn!("discarded-output sink still referenced at shutdown"),
    }

    info!("mcp-gateway shut down");
    Ok(())
}

fn log_serve_outcome(joined: std::result::Result<Result<()>, JoinError>) {
    match joined {
        Ok(Ok(())) => info!("stopped serving the host"),
        Ok(Err(err)) => error!(%err, "serving the host failed"),
        Err(err) => error!(%err, "host session task panicked"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat, debug: bool, log_file: Option<String>) -> Result<()> {
    let default_level = if debug { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout carries the protocol, so logs go to stderr and optionally a file.
    let file = log_file.and_then(|path| {
        match std::fs::OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Some(file),
            Err(err) => {
                eprintln!("Warning: failed to open {LOG_FILE_ENV}='{path}': {err}");
                None
            }
        }
    });
    let ansi = file.is_none();
    let writer = match file {
        Some(file) => BoxMakeWriter::new(std::io::stderr.and(Mutex::new(file))),
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(ansi);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
