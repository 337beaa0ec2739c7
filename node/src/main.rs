// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Peerflash Node
//!
//! Entry point for the `peerflash-node` binary. Parses CLI arguments,
//! initializes logging and metrics, and serves the authentication API.
//!
//! The binary supports four subcommands:
//!
//! - `run`     start the authentication server
//! - `keygen`  generate an identity keypair and print its DID
//! - `sign`    sign a login credential over a nonce
//! - `version` print build version information

mod api;
mod cli;
mod cookie;
mod logging;
mod metrics;
mod middleware;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use tokio::signal;

use peerflash_protocol::config::{AuthConfig, NoncePolicy, SessionSecret};
use peerflash_protocol::credential::CredentialBuilder;
use peerflash_protocol::crypto::IdentityKeypair;
use peerflash_protocol::identity::DidKey;
use peerflash_protocol::storage::AuthDb;

use cli::{Commands, PeerflashCli};
use metrics::AuthMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = PeerflashCli::parse();

    match cli.command {
        Commands::Run(args) => run_server(args).await,
        Commands::Keygen(args) => keygen(args),
        Commands::Sign(args) => sign(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the API server and the metrics endpoint, and runs until a
/// shutdown signal arrives.
async fn run_server(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(&args.log_filter, args.log_format.into());

    tracing::info!(
        listen = %args.listen,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        dev = args.dev,
        "starting peerflash-node"
    );

    // --- Configuration ---
    let secret = match (args.session_secret, args.dev) {
        (Some(secret), _) => {
            SessionSecret::new(secret.into_bytes()).context("invalid session secret")?
        }
        (None, true) => {
            tracing::warn!("no session secret configured, using an ephemeral one (dev mode)");
            SessionSecret::ephemeral()
        }
        (None, false) => anyhow::bail!(
            "a session secret is required outside dev mode \
             (set --session-secret or PEERFLASH_SESSION_SECRET)"
        ),
    };
    let policy = if args.burn_nonce_on_failure {
        NoncePolicy::BurnOnFailure
    } else {
        NoncePolicy::RetainOnFailure
    };
    let config = AuthConfig::new(secret)
        .with_cookie_secure(!args.dev)
        .with_nonce_policy(policy);
    if args.dev {
        tracing::warn!("dev mode: session cookie is sent without the Secure attribute");
    }

    // --- Persistent storage ---
    let db_path = args.data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;

    let db = AuthDb::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    tracing::info!(
        path = %db_path.display(),
        identities = db.identity_count(),
        "database opened"
    );

    // --- Metrics ---
    let auth_metrics = Arc::new(AuthMetrics::new());

    // --- Application state ---
    let app_state = api::AppState::new(db.clone(), config, Arc::clone(&auth_metrics));

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind API listener on {}", args.listen))?;
    tracing::info!("API server listening on {}", args.listen);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&auth_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    db.flush().context("failed to flush database")?;
    tracing::info!("peerflash-node stopped");
    Ok(())
}

/// Generates an identity keypair, writes the secret key, and prints the DID.
fn keygen(args: cli::KeygenArgs) -> Result<()> {
    let keypair = IdentityKeypair::generate();
    let did = DidKey::from_public_key(&keypair.public_key());

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(&args.out)
        .with_context(|| format!("failed to create key file {}", args.out.display()))?;
    writeln!(file, "{}", keypair.secret_key_base64())
        .with_context(|| format!("failed to write key file {}", args.out.display()))?;

    println!("Identity generated.");
    println!("  Key file : {}", args.out.display());
    println!("  DID      : {}", did);

    Ok(())
}

/// Signs a login credential and prints the `/verify` request body.
fn sign(args: cli::SignArgs) -> Result<()> {
    let encoded = std::fs::read_to_string(&args.key)
        .with_context(|| format!("failed to read key file {}", args.key.display()))?;
    let keypair = IdentityKeypair::from_base64(encoded.trim())
        .with_context(|| format!("invalid key file {}", args.key.display()))?;
    let did = DidKey::from_public_key(&keypair.public_key());

    let credential = CredentialBuilder::new(&did, args.nonce)
        .sign(&keypair)
        .context("failed to sign credential")?;

    let body = serde_json::json!({ "did": did.as_str(), "credential": credential });
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("peerflash-node     {}", env!("CARGO_PKG_VERSION"));
    println!("peerflash-protocol {}", peerflash_protocol::VERSION);
    println!("rustc              {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
