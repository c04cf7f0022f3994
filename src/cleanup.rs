// src/cleanup.rs
use crate::db::Store;
use crate::error::StoreResult;
use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use serde::Serialize;
use std::time::Duration as StdDuration;

pub const DEFAULT_RETENTION_DAYS: u32 = 30;
/// Upper bound accepted for the retention window, about ten years.
pub const MAX_RETENTION_DAYS: u32 = 3650;

pub fn cutoff(now: DateTime<Utc>, retention_days: u32) -> DateTime<Utc> {
    now - Duration::days(i64::from(retention_days))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupPreview {
    pub count: u64,
    pub cutoff_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub deleted_count: u64,
    pub cutoff_date: DateTime<Utc>,
}

pub async fn preview(store: &dyn Store, retention_days: u32) -> StoreResult<CleanupPreview> {
    let cutoff_date = cutoff(Utc::now(), retention_days);
    let count = store.count_transactions_before(cutoff_date).await?;
    Ok(CleanupPreview { count, cutoff_date })
}

pub async fn run(store: &dyn Store, retention_days: u32) -> StoreResult<CleanupReport> {
    let cutoff_date = cutoff(Utc::now(), retention_days);
    let deleted_count = store.delete_transactions_before(cutoff_date).await?;
    info!(
        "Deleted {} transactions older than {}",
        deleted_count,
        cutoff_date.to_rfc3339()
    );
    Ok(CleanupReport {
        deleted_count,
        cutoff_date,
    })
}

/// Operator-driven cleanup: preview, give a grace period to cancel, then delete.
/// Returns `None` when nothing was deleted because there was nothing to delete
/// or the operator cancelled.
pub async fn run_interactive(
    store: &dyn Store,
    retention_days: u32,
    delay: StdDuration,
) -> StoreResult<Option<CleanupReport>> {
    let found = preview(store, retention_days).await?;
    info!(
        "Deleting transactions older than: {}",
        found.cutoff_date.to_rfc3339()
    );
    info!("Found {} transactions to delete", found.count);
    if found.count == 0 {
        info!("No transactions to delete. Exiting.");
        return Ok(None);
    }

    info!(
        "Deleting in {} seconds... Press Ctrl+C to cancel",
        delay.as_secs()
    );
    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = tokio::signal::ctrl_c() => {
            warn!("Cleanup cancelled.");
            return Ok(None);
        }
    }

    run(store, retention_days).await.map(Some)
}
