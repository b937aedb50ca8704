use crate::domain::models::{Feed, InsertOutcome, NewEntry};
use sqlx::{Error as SqlxError, PgConnection, PgPool};

/// Returns up to `limit` feeds that are due for fetching: `next_poll_at`
/// null (never polled, scheduled first) or not in the future.
pub async fn list_due_feeds(pool: &PgPool, limit: i64) -> Result<Vec<Feed>, SqlxError> {
    let feeds = sqlx::query_as::<_, Feed>(
        r#"
        SELECT id, url, title, poll_interval, next_poll_at,
               last_fetched_at, last_status, last_error
        FROM feeds
        WHERE next_poll_at IS NULL OR next_poll_at <= now()
        ORDER BY next_poll_at ASC NULLS FIRST
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(feeds)
}

/// Records a completed fetch: stores the HTTP status, clears any previous
/// error, and pushes `next_poll_at` forward by `poll_seconds`. The title is
/// only overwritten when the parser produced one.
pub async fn record_fetch_success(
    pool: &PgPool,
    feed_id: i64,
    title: Option<&str>,
    status: i32,
    poll_seconds: i64,
) -> Result<(), SqlxError> {
    sqlx::query(
        r#"
        UPDATE feeds
        SET title = COALESCE($1, title),
            last_status = $2,
            last_fetched_at = now(),
            last_error = NULL,
            next_poll_at = now() + make_interval(secs => $3)
        WHERE id = $4
        "#,
    )
    .bind(title)
    .bind(status)
    .bind(poll_seconds as f64)
    .bind(feed_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Records a failed fetch attempt. The penalty interval is a fixed hour
/// regardless of the feed's configured cadence.
pub async fn record_fetch_failure(
    pool: &PgPool,
    feed_id: i64,
    error_text: &str,
) -> Result<(), SqlxError> {
    sqlx::query(
        r#"
        UPDATE feeds
        SET last_status = NULL,
            last_error = $1,
            last_fetched_at = now(),
            next_poll_at = now() + interval '1 hour'
        WHERE id = $2
        "#,
    )
    .bind(error_text)
    .bind(feed_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Inserts one entry, ignoring duplicates on `entries_unique_guid`.
/// `fetched_at` is filled in by the server default.
pub async fn insert_entry(
    conn: &mut PgConnection,
    feed_id: i64,
    entry: &NewEntry,
) -> Result<InsertOutcome, SqlxError> {
    let result = sqlx::query(
        r#"
        INSERT INTO entries (feed_id, guid, link, title, summary, content, published_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT ON CONSTRAINT entries_unique_guid DO NOTHING
        "#,
    )
    .bind(feed_id)
    .bind(&entry.guid)
    .bind(&entry.link)
    .bind(&entry.title)
    .bind(&entry.summary)
    .bind(&entry.content)
    .bind(entry.published_at)
    .bind(entry.updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        Ok(InsertOutcome::Duplicate)
    } else {
        Ok(InsertOutcome::Inserted)
    }
}
