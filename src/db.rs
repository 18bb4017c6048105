//! # Feedback Persistence
//!
//! Append-only per-user feedback log behind the [`FeedbackStore`] trait.
//!
//! - [`SqliteFeedbackStore`] keeps events in a `feedback` table, one JSON
//!   payload per row, in `<data_dir>/vibenav/feedback.db` by default
//! - [`MemoryFeedbackStore`] keeps them in a map for tests and throwaway trips
//!
//! Rows are never updated or deleted.

use crate::feedback::FeedbackEvent;
use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Append-only event log keyed by username.
///
/// Calls may block. Trip code reaches the store through
/// [`crate::feedback::PreferenceLearner`]'s `*_blocking` methods, which run
/// them on tokio's blocking pool.
pub trait FeedbackStore: Send + Sync {
    /// Persist one event at the end of `user`'s log.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn append(&self, user: &str, event: &FeedbackEvent) -> Result<()>;

    /// Every event for `user`, oldest first.
    ///
    /// # Errors
    ///
    /// Storage failures or undecodable rows.
    fn history(&self, user: &str) -> Result<Vec<FeedbackEvent>>;
}

/// SQLite-backed store
#[derive(Debug)]
pub struct SqliteFeedbackStore {
    conn: Mutex<Connection>,
}

impl SqliteFeedbackStore {
    /// Open (or create) the database at `path` and make sure the table exists.
    ///
    /// # Errors
    ///
    /// The file can't be opened or the schema can't be created.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open feedback database at {}", path.display()))?;
        Self::init(conn)
    }

    /// Database that lives only as long as the store.
    ///
    /// # Errors
    ///
    /// SQLite could not allocate the database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory feedback database")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS feedback (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                username   TEXT    NOT NULL,
                kind       TEXT    NOT NULL,
                payload    TEXT    NOT NULL,
                created_at TEXT    NOT NULL
            )",
            (),
        )
        .context("Invalid SQL when creating feedback table")?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_feedback_username ON feedback(username, id)",
            (),
        )
        .context("Invalid SQL when creating feedback index")?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("Feedback database lock poisoned"))
    }
}

impl FeedbackStore for SqliteFeedbackStore {
    fn append(&self, user: &str, event: &FeedbackEvent) -> Result<()> {
        let payload = serde_json::to_string(event).context("Failed to serialize feedback event")?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO feedback (username, kind, payload, created_at) VALUES (?1, ?2, ?3, ?4)",
            (user, event.kind(), &payload, event.created_at().to_rfc3339()),
        )
        .with_context(|| format!("Failed to INSERT feedback for user {user}"))?;

        log::trace!("Stored {} event for {user}", event.kind());
        Ok(())
    }

    fn history(&self, user: &str) -> Result<Vec<FeedbackEvent>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT payload FROM feedback WHERE username = ?1 ORDER BY id")
            .context("Invalid SQL when SELECTing feedback")?;

        let payloads = stmt
            .query_map([user], |row| row.get::<_, String>(0))
            .with_context(|| format!("Cannot query feedback for user {user}"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read feedback rows")?;

        payloads
            .iter()
            .map(|p| serde_json::from_str(p).with_context(|| format!("Corrupt feedback payload: {p}")))
            .collect()
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryFeedbackStore {
    events: Mutex<HashMap<String, Vec<FeedbackEvent>>>,
}

impl MemoryFeedbackStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeedbackStore for MemoryFeedbackStore {
    fn append(&self, user: &str, event: &FeedbackEvent) -> Result<()> {
        let mut events = self.events.lock().map_err(|_| anyhow!("Feedback store lock poisoned"))?;
        events.entry(user.to_string()).or_default().push(event.clone());
        Ok(())
    }

    fn history(&self, user: &str) -> Result<Vec<FeedbackEvent>> {
        let events = self.events.lock().map_err(|_| anyhow!("Feedback store lock poisoned"))?;
        Ok(events.get(user).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{TrafficLevel, WeatherCondition};
    use crate::feedback::{FeedbackAction, FeedbackContext, TripRating};
    use crate::track::TrackCandidate;
    use crate::vibe::Vibe;

    fn context() -> FeedbackContext {
        FeedbackContext {
            mood: Vibe::Happy,
            vibe: Vibe::Calm,
            weather_condition: WeatherCondition::Rain,
            traffic_level: TrafficLevel::Light,
        }
    }

    fn events() -> Vec<FeedbackEvent> {
        let track = TrackCandidate::new("7", "Circles", "Post Malone");
        vec![
            FeedbackEvent::track_action(&track, FeedbackAction::Skipped, &context()),
            FeedbackEvent::trip_rating(TripRating::Great, &context()),
        ]
    }

    fn exercise(store: &dyn FeedbackStore) {
        let written = events();
        for event in &written {
            store.append("ada", event).unwrap();
        }
        store.append("grace", &written[1]).unwrap();

        assert_eq!(store.history("ada").unwrap(), written);
        assert_eq!(store.history("grace").unwrap().len(), 1);
        assert!(store.history("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_memory_store() {
        exercise(&MemoryFeedbackStore::new());
    }

    #[test]
    fn test_sqlite_store_in_memory() {
        exercise(&SqliteFeedbackStore::in_memory().unwrap());
    }

    #[test]
    fn test_sqlite_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback.db");

        let written = events();

        {
            let store = SqliteFeedbackStore::open(&path).unwrap();
            for event in &written {
                store.append("ada", event).unwrap();
            }
        }

        let store = SqliteFeedbackStore::open(&path).unwrap();
        assert_eq!(store.history("ada").unwrap(), written);
    }

    #[test]
    fn test_sqlite_rows_are_tagged() {
        let store = SqliteFeedbackStore::in_memory().unwrap();
        store.append("ada", &events()[0]).unwrap();

        let conn = store.lock().unwrap();
        let (kind, payload): (String, String) = conn
            .query_row("SELECT kind, payload FROM feedback", [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!(kind, "track_action");
        assert!(payload.contains("\"type\":\"track_action\""));
        assert!(payload.contains("\"action\":\"skipped\""));
        assert!(payload.contains("\"track_id\":\"7\""));
    }
}
