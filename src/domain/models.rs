use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of the feed registry.
///
/// Rows are created and updated by the management CLI; the engine only
/// reads them and writes the status columns after each fetch attempt.
/// After any attempt, exactly one of `last_status` / `last_error` is set.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Feed {
    pub id: i64,
    pub url: String,
    pub title: Option<String>,
    pub poll_interval: i64,
    pub next_poll_at: Option<DateTime<Utc>>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub last_status: Option<i32>,
    pub last_error: Option<String>,
}

/// An entry extracted from a feed document, not yet persisted.
///
/// `guid` is the feed-supplied identifier and stays `None` when the
/// document carries none; such entries are exempt from deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEntry {
    pub guid: Option<String>,
    pub link: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Outcome of one entry insert against the `entries_unique_guid` constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The constraint matched an existing row; counted as success.
    Duplicate,
}
