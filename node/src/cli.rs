//! # CLI Interface
//!
//! Defines the command-line argument structure for `peerflash-node` using
//! `clap` derive. Supports four subcommands: `run`, `keygen`, `sign`, and
//! `version`.
//!
//! `keygen` and `sign` are the client side of the protocol, for scripting
//! and testing logins without a browser.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Peerflash authentication server and client tooling.
#[derive(Parser, Debug)]
#[command(
    name = "peerflash-node",
    about = "Peerflash DID authentication server",
    version,
    propagate_version = true
)]
pub struct PeerflashCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the Peerflash binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the authentication server.
    Run(RunArgs),
    /// Generate a new identity keypair and print its DID.
    Keygen(KeygenArgs),
    /// Sign a login credential over a server-issued nonce and print the
    /// `/verify` request body.
    Sign(SignArgs),
    /// Print version information and exit.
    Version,
}

/// `--log-format` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Directory holding the identity database. Created on first run.
    #[arg(long, short = 'd', env = "PEERFLASH_DATA_DIR", default_value = "./peerflash-data")]
    pub data_dir: PathBuf,

    /// Address for the HTTP API.
    #[arg(long, env = "PEERFLASH_LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "PEERFLASH_METRICS_PORT", default_value_t = 9742)]
    pub metrics_port: u16,

    /// HMAC secret for session tokens, at least 32 bytes.
    ///
    /// Required unless `--dev` is set, in which case a random secret is
    /// generated and sessions do not survive a restart.
    #[arg(long, env = "PEERFLASH_SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Local development mode: drops the `Secure` cookie attribute and
    /// allows running without a configured session secret.
    #[arg(long, env = "PEERFLASH_DEV")]
    pub dev: bool,

    /// Invalidate the outstanding nonce after any failed verify attempt
    /// instead of allowing retries until it expires.
    #[arg(long, env = "PEERFLASH_BURN_NONCE_ON_FAILURE")]
    pub burn_nonce_on_failure: bool,

    /// Log output format.
    #[arg(long, value_enum, env = "PEERFLASH_LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormatArg,

    /// Filter directives used when `RUST_LOG` is unset.
    #[arg(
        long,
        env = "PEERFLASH_LOG_FILTER",
        default_value = "peerflash_node=info,peerflash_protocol=info,tower_http=debug"
    )]
    pub log_filter: String,
}

/// Arguments for the `keygen` subcommand.
#[derive(Parser, Debug)]
pub struct KeygenArgs {
    /// Where to write the base64 secret key. Overwrites nothing: fails if
    /// the file exists.
    #[arg(long, short = 'o', default_value = "identity.key")]
    pub out: PathBuf,
}

/// Arguments for the `sign` subcommand.
#[derive(Parser, Debug)]
pub struct SignArgs {
    /// Secret key file written by `keygen`.
    #[arg(long, short = 'k')]
    pub key: PathBuf,

    /// Nonce returned by `POST /login`.
    #[arg(long, short = 'n')]
    pub nonce: String,
}
