//! Background task that closes out calls stuck `in_progress` after a crash
//! or dropped socket.

use hostline_db::DbPool;
use std::time::Duration;
use tokio::time::sleep;

/// Runs one reconciliation sweep. Returns the SIDs that were flipped.
pub async fn run_sweep(pool: DbPool, threshold_minutes: u32) -> Vec<String> {
    let result = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        hostline_store::reconcile_stale(&conn, threshold_minutes).map_err(|e| e.to_string())
    })
    .await;

    match result {
        Ok(Ok(reconciled)) => {
            if !reconciled.is_empty() {
                tracing::info!(count = reconciled.len(), "reconciled stale calls");
                for call_sid in &reconciled {
                    tracing::info!(call_sid = %call_sid, "stale call marked completed");
                }
            }
            reconciled
        }
        Ok(Err(e)) => {
            tracing::error!("stale-call sweep failed: {}", e);
            Vec::new()
        }
        Err(e) => {
            tracing::error!("stale-call sweep panicked or was cancelled: {}", e);
            Vec::new()
        }
    }
}

/// Starts the reconciler: one sweep immediately (catching calls orphaned by
/// a previous process), then one per interval. Runs indefinitely.
pub async fn start_reconciler_task(pool: DbPool, interval_seconds: u64, threshold_minutes: u32) {
    if interval_seconds == 0 {
        tracing::warn!("stale-call reconciler disabled (interval=0)");
        return;
    }

    tracing::info!(
        interval_seconds,
        threshold_minutes,
        "starting stale-call reconciler"
    );

    run_sweep(pool.clone(), threshold_minutes).await;

    let interval = Duration::from_secs(interval_seconds);
    loop {
        sleep(interval).await;
        run_sweep(pool.clone(), threshold_minutes).await;
    }
}
