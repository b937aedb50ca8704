use crate::domain::models::NewEntry;
use bytes::Bytes;
use feed_rs::parser;
use tokio::task::JoinError;

/// Decoded form of one feed payload.
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<NewEntry>,
    /// True when the payload could not be parsed as RSS or Atom. The engine
    /// treats such a fetch as a success with zero entries, not a failure.
    pub lenient: bool,
}

/// Decodes a feed payload on the blocking thread pool.
///
/// feed-rs walks the whole document synchronously; on large payloads that
/// would stall the I/O scheduler if run inline.
pub async fn parse_payload(payload: Bytes) -> Result<ParsedFeed, JoinError> {
    tokio::task::spawn_blocking(move || parse_bytes(&payload)).await
}

pub fn parse_bytes(payload: &[u8]) -> ParsedFeed {
    // Entries with no feed-supplied id keep a null guid. feed-rs would
    // otherwise synthesize one, which can change between fetches and defeat
    // deduplication.
    let parser = parser::Builder::new()
        .id_generator(|_links, _title, _uri| String::new())
        .build();

    let feed = match parser.parse(payload) {
        Ok(feed) => feed,
        Err(err) => {
            tracing::debug!("Unparseable feed payload: {}", err);
            return ParsedFeed {
                title: None,
                entries: Vec::new(),
                lenient: true,
            };
        }
    };

    ParsedFeed {
        title: feed.title.map(|t| t.content),
        entries: feed.entries.into_iter().map(entry_from_parsed).collect(),
        lenient: false,
    }
}

fn entry_from_parsed(entry: feed_rs::model::Entry) -> NewEntry {
    NewEntry {
        guid: (!entry.id.is_empty()).then_some(entry.id),
        link: entry.links.into_iter().next().map(|link| link.href),
        title: entry.title.map(|t| t.content),
        summary: entry.summary.map(|s| s.content),
        content: entry.content.and_then(|c| c.body),
        published_at: entry.published,
        updated_at: entry.updated,
    }
}
