use crate::config::Config;
use crate::domain::models::Feed;
use crate::infrastructure::fetcher::Fetcher;
use crate::infrastructure::scheduler;
use crate::infrastructure::workers::{self, FetchContext, PollPolicy, WriteItem};
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

/// Wires the pipeline together and owns its lifecycle.
///
/// Startup order: writers, fetchers, scheduler. Shutdown drains in the
/// opposite direction: the scheduler stops, the fetch queue is terminated
/// with one sentinel per fetcher, then the write queue with one per
/// writer, and finally the store pool closes. Entries emitted by fetches
/// that were in flight at signal time are always written before exit.
pub async fn run(config: Config, pool: PgPool) -> anyhow::Result<()> {
    let fetcher = Arc::new(Fetcher::new(config.per_host_limit).context("build HTTP client")?);

    // Bounded queues: the fetch bound stalls the scheduler when the
    // fetchers fall behind, the write bound stalls fetchers when the
    // writers do.
    let (fetch_tx, fetch_rx) = mpsc::channel::<Option<Feed>>(config.fetch_concurrency * 2);
    let (write_tx, write_rx) = mpsc::channel::<Option<WriteItem>>(config.write_concurrency * 10);
    let fetch_rx = Arc::new(Mutex::new(fetch_rx));
    let write_rx = Arc::new(Mutex::new(write_rx));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let writers: Vec<JoinHandle<()>> = (0..config.write_concurrency)
        .map(|_| tokio::spawn(workers::run_writer_worker(pool.clone(), write_rx.clone())))
        .collect();

    let ctx = FetchContext {
        pool: pool.clone(),
        fetcher,
        write_tx: write_tx.clone(),
        policy: PollPolicy {
            default_seconds: config.default_poll_seconds,
            honor_feed_interval: config.honor_feed_interval,
        },
    };

    let fetchers: Vec<JoinHandle<()>> = (0..config.fetch_concurrency)
        .map(|_| {
            tokio::spawn(workers::run_fetch_worker(
                ctx.clone(),
                fetch_rx.clone(),
                shutdown_rx.clone(),
            ))
        })
        .collect();

    let scheduler_handle = tokio::spawn(scheduler::scheduler_loop(
        pool.clone(),
        fetch_tx.clone(),
        shutdown_rx,
    ));

    tracing::info!(
        "Ingestion engine running ({} fetchers, {} writers, per-host limit {})",
        config.fetch_concurrency,
        config.write_concurrency,
        config.per_host_limit
    );

    wait_for_shutdown_signal().await?;
    tracing::info!("Shutdown signal received; draining pipeline");

    // 1. Stop the scheduler; fetch workers start discarding queued tasks.
    let _ = shutdown_tx.send(true);
    let _ = scheduler_handle.await;

    // 2. Terminate and drain the fetch pool.
    for _ in 0..config.fetch_concurrency {
        if fetch_tx.send(None).await.is_err() {
            break;
        }
    }
    drop(fetch_tx);
    for handle in fetchers {
        let _ = handle.await;
    }

    // 3. Terminate and drain the writer pool.
    for _ in 0..config.write_concurrency {
        if write_tx.send(None).await.is_err() {
            break;
        }
    }
    drop(write_tx);
    for handle in writers {
        let _ = handle.await;
    }

    // 4. Close the store.
    pool.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("install SIGTERM handler")?;
        tokio::select! {
            result = signal::ctrl_c() => result.context("listen for SIGINT")?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    signal::ctrl_c().await.context("listen for SIGINT")?;

    Ok(())
}
