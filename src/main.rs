// src/main.rs
mod api;
mod auth;
mod cleanup;
mod config;
mod db;
mod error;
mod logos;
mod market;
mod memstore;
mod models;
mod portfolio;

use crate::api::Context;
use crate::auth::AuthConfig;
use crate::config::{CleanupArgs, Cli, Commands, ServeArgs, StoreKind};
use crate::db::{ScyllaStore, Store};
use crate::error::StoreResult;
use crate::market::{market_status, FinnhubClient};
use crate::memstore::MemoryStore;
use chrono::Utc;
use clap::Parser;
use env_logger::Builder;
use log::{error, info, warn};
use reqwest::Client;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

async fn open_store(cli: &Cli) -> StoreResult<Arc<dyn Store>> {
    match cli.store {
        StoreKind::Scylla => Ok(Arc::new(ScyllaStore::connect(&cli.scylla_node).await?)),
        StoreKind::Memory => {
            warn!("Using the in-memory store; data is lost on exit.");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn serve(store: Arc<dyn Store>, args: ServeArgs) {
    if args.finnhub_api_key.is_none() {
        warn!("FINNHUB_API_KEY is not set; market endpoints will fail.");
    }
    let market = FinnhubClient::new(Client::new(), args.finnhub_base_url, args.finnhub_api_key);
    let ctx = Arc::new(Context {
        store,
        market: Arc::new(market),
        auth: Arc::new(AuthConfig::new(
            args.jwt_secret,
            args.token_ttl_hours,
            args.bcrypt_cost,
        )),
        cron_secret: args.cron_secret.filter(|s| !s.is_empty()),
        retention_days: args.retention_days,
        sell_guard: Mutex::new(()),
    });

    let routes = api::routes(ctx);
    info!(
        "Server running on http://{} (market is {:?})",
        args.bind,
        market_status(Utc::now())
    );
    warp::serve(routes).run(args.bind).await;
}

async fn run_cleanup(store: Arc<dyn Store>, args: CleanupArgs) -> StoreResult<()> {
    let delay = Duration::from_secs(args.delay_secs);
    let outcome = cleanup::run_interactive(store.as_ref(), args.retention_days, delay).await?;
    if let Some(report) = outcome {
        info!("Successfully deleted {} transactions", report.deleted_count);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    Builder::new()
        .filter_level(cli.log_level)
        .format_timestamp_secs()
        .init();

    let store = match open_store(&cli).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Connected to database...");

    match cli.command {
        Commands::Serve(args) => {
            info!("Starting the portfolio tracker API...");
            serve(store, args).await;
        }
        Commands::Cleanup(args) => {
            if let Err(e) = run_cleanup(store, args).await {
                error!("Error during cleanup: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}
