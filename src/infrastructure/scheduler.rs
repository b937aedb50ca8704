use crate::domain::models::Feed;
use crate::infrastructure::repository;
use sqlx::PgPool;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Max feeds selected per tick; caps the in-flight fan-out.
pub const DUE_BATCH_LIMIT: i64 = 500;
/// Pause after enqueueing a batch; bounds the store query rate.
const BATCH_PAUSE: Duration = Duration::from_secs(1);
/// Pause when nothing is due; bounds idle polling.
const IDLE_PAUSE: Duration = Duration::from_secs(10);

/// Selects due feeds and pushes them onto the fetch queue until shutdown.
///
/// All schedule truth lives in the store; the loop keeps no state between
/// ticks and is safe to restart at any point. Enqueueing awaits queue
/// capacity, which is the primary backpressure lever: a full fetch queue
/// stalls selection entirely.
pub async fn scheduler_loop(
    pool: PgPool,
    fetch_tx: mpsc::Sender<Option<Feed>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let due = match repository::list_due_feeds(&pool, DUE_BATCH_LIMIT).await {
            Ok(due) => due,
            Err(err) => {
                // Not fatal: transient store errors look like an empty batch.
                tracing::error!("Due-feed query failed: {}", err);
                if pause(IDLE_PAUSE, &mut shutdown).await {
                    return;
                }
                continue;
            }
        };

        if due.is_empty() {
            tracing::debug!("No feeds due; sleeping {}s", IDLE_PAUSE.as_secs());
            if pause(IDLE_PAUSE, &mut shutdown).await {
                return;
            }
            continue;
        }

        tracing::info!("Found {} feeds due for fetching", due.len());
        for feed in due {
            tokio::select! {
                sent = fetch_tx.send(Some(feed)) => {
                    if sent.is_err() {
                        tracing::warn!("Fetch queue closed; scheduler stopping");
                        return;
                    }
                }
                _ = shutdown.changed() => return,
            }
        }

        if pause(BATCH_PAUSE, &mut shutdown).await {
            return;
        }
    }
}

/// Sleeps for `duration` unless shutdown fires first; true means stop.
async fn pause(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = shutdown.changed() => true,
    }
}
