use crate::domain::models::{Feed, InsertOutcome, NewEntry};
use crate::infrastructure::fetcher::Fetcher;
use crate::infrastructure::{parser, repository};
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

/// One parsed entry addressed to its feed, travelling fetcher → writer.
pub type WriteItem = (i64, NewEntry);

/// Pool workers share a single queue receiver; the mutex hands each
/// message — sentinels included — to exactly one worker. `None` on a
/// queue is the termination sentinel.
pub type SharedReceiver<T> = Arc<Mutex<mpsc::Receiver<Option<T>>>>;

/// How the success path advances `next_poll_at`.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub default_seconds: i64,
    /// Honor the per-feed `poll_interval` column instead of the global
    /// default (`HONOR_FEED_INTERVAL`).
    pub honor_feed_interval: bool,
}

impl PollPolicy {
    /// Seconds until the feed is due again after a successful fetch.
    pub fn next_poll_seconds(&self, feed: &Feed) -> i64 {
        if self.honor_feed_interval {
            feed.poll_interval
        } else {
            self.default_seconds
        }
    }
}

/// Everything a fetch worker needs, cloned per worker.
#[derive(Clone)]
pub struct FetchContext {
    pub pool: PgPool,
    pub fetcher: Arc<Fetcher>,
    pub write_tx: mpsc::Sender<Option<WriteItem>>,
    pub policy: PollPolicy,
}

/// Fetch worker body: pop a due feed, fetch, parse, record, emit entries.
///
/// Errors never escape the worker; they are logged with the feed URL and
/// the next task is picked up. Once shutdown is flagged, queued tasks are
/// discarded unprocessed: the feeds keep their previous `next_poll_at` and
/// are re-selected after restart.
pub async fn run_fetch_worker(
    ctx: FetchContext,
    rx: SharedReceiver<Feed>,
    shutdown: watch::Receiver<bool>,
) {
    loop {
        let message = { rx.lock().await.recv().await };
        let feed = match message {
            Some(Some(feed)) => feed,
            // Sentinel, or queue closed: this worker is done.
            Some(None) | None => break,
        };

        if *shutdown.borrow() {
            tracing::debug!("Discarding queued feed during shutdown: {}", feed.url);
            continue;
        }

        if let Err(err) = process_feed(&ctx, &feed).await {
            tracing::error!("Fetch worker error for {}: {:#}", feed.url, err);
        }
    }
}

/// The full fetch → parse → record → emit sequence for one due feed.
async fn process_feed(ctx: &FetchContext, feed: &Feed) -> anyhow::Result<()> {
    tracing::info!("Fetching feed {}", feed.url);

    let payload = match ctx.fetcher.fetch(&feed.url).await {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!("Failed fetch {}: {}", feed.url, err);
            repository::record_fetch_failure(&ctx.pool, feed.id, &err.to_string())
                .await
                .context("record fetch failure")?;
            return Ok(());
        }
    };

    let status = payload.status;
    let parsed = parser::parse_payload(payload.body)
        .await
        .context("feed parse task")?;

    if parsed.lenient {
        tracing::warn!("Unparseable payload from {}; recording zero entries", feed.url);
    }

    repository::record_fetch_success(
        &ctx.pool,
        feed.id,
        parsed.title.as_deref(),
        i32::from(status.as_u16()),
        ctx.policy.next_poll_seconds(feed),
    )
    .await
    .context("record fetch success")?;

    tracing::info!("Parsed {} entries from {}", parsed.entries.len(), feed.url);

    for entry in parsed.entries {
        ctx.write_tx
            .send(Some((feed.id, entry)))
            .await
            .map_err(|_| anyhow::anyhow!("write queue closed"))?;
    }

    Ok(())
}

/// Writer body: hold one store connection, insert entries until the
/// sentinel. Duplicates are expected and silent; insert errors are logged
/// and the item dropped — there is no retry queue.
pub async fn run_writer_worker(pool: PgPool, rx: SharedReceiver<WriteItem>) {
    let mut conn = match pool.acquire().await {
        Ok(conn) => conn,
        Err(err) => {
            tracing::error!("Writer could not acquire a store connection: {}", err);
            return;
        }
    };

    loop {
        let message = { rx.lock().await.recv().await };
        let (feed_id, entry) = match message {
            Some(Some(item)) => item,
            Some(None) | None => break,
        };

        match repository::insert_entry(&mut conn, feed_id, &entry).await {
            Ok(InsertOutcome::Inserted) => {}
            Ok(InsertOutcome::Duplicate) => {
                tracing::debug!(
                    "Duplicate entry skipped (feed {}, guid {:?})",
                    feed_id,
                    entry.guid
                );
            }
            Err(err) => {
                tracing::error!(
                    "Entry insert failed (feed {}, guid {:?}): {}",
                    feed_id,
                    entry.guid,
                    err
                );
            }
        }
    }
}
