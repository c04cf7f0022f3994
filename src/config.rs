// src/config.rs
//! Command-line and environment configuration.

use crate::cleanup::{DEFAULT_RETENTION_DAYS, MAX_RETENTION_DAYS};
use crate::market::FINNHUB_BASE_URL;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::net::SocketAddr;

/// Portfolio tracker API
#[derive(Debug, Parser)]
#[command(name = "portfolio_tracker")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log verbosity (off, error, warn, info, debug, trace).
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: LevelFilter,

    /// Backing store for users, wishlists and transactions.
    #[arg(long, value_enum, default_value_t = StoreKind::Scylla, global = true)]
    pub store: StoreKind,

    /// ScyllaDB contact point.
    #[arg(long, env = "SCYLLA_NODE", default_value = "127.0.0.1:9042", global = true)]
    pub scylla_node: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    Scylla,
    /// Volatile in-process store, for local development.
    Memory,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Delete transactions older than the retention window
    Cleanup(CleanupArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3030")]
    pub bind: SocketAddr,

    /// Finnhub token. Market endpoints answer 500 without it.
    #[arg(long, env = "FINNHUB_API_KEY", hide_env_values = true)]
    pub finnhub_api_key: Option<String>,

    #[arg(long, env = "FINNHUB_BASE_URL", default_value = FINNHUB_BASE_URL)]
    pub finnhub_base_url: String,

    /// HMAC secret used to sign session tokens.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    #[arg(long, env = "TOKEN_TTL_HOURS", default_value_t = 168)]
    pub token_ttl_hours: i64,

    #[arg(long, env = "BCRYPT_COST", default_value_t = bcrypt::DEFAULT_COST)]
    pub bcrypt_cost: u32,

    /// When set, the cleanup endpoint requires `Authorization: Bearer <secret>`.
    #[arg(long, env = "CRON_SECRET", hide_env_values = true)]
    pub cron_secret: Option<String>,

    /// Transactions older than this many days are deleted by cleanup.
    #[arg(
        long,
        env = "RETENTION_DAYS",
        default_value_t = DEFAULT_RETENTION_DAYS,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_RETENTION_DAYS))
    )]
    pub retention_days: u32,
}

#[derive(Debug, Args)]
pub struct CleanupArgs {
    /// Transactions older than this many days are deleted by cleanup.
    #[arg(
        long,
        env = "RETENTION_DAYS",
        default_value_t = DEFAULT_RETENTION_DAYS,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_RETENTION_DAYS))
    )]
    pub retention_days: u32,

    /// Grace period before deleting, during which Ctrl+C cancels.
    #[arg(long, default_value_t = 3)]
    pub delay_secs: u64,
}
