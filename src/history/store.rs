use crate::error::Result;
use crate::history::HistoryRecord;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::info;

/// Append-only inference log, backed by SQLite.
///
/// The original service materialized the whole log on every append, which
/// loses records under concurrent writers. This store instead appends one row
/// per inference and serializes writers behind its connection mutex, so
/// concurrent appends cannot drop each other.
pub struct HistoryStore {
    conn: Mutex<Connection>,
}

const SELECT_COLUMNS: &str =
    "timestamp, filename, predicted_emotion, confidence, top_3_probabilities";

impl HistoryStore {
    pub fn open(path: &Path) -> Result<Self> {
        info!("Opening history store at {:?}", path);
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Ephemeral store backed by an in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(include_str!("../../migrations/001_init.sql"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Append one record. Existing rows are never touched.
    pub fn append(&self, record: &HistoryRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO emotion_history (timestamp, filename, predicted_emotion, confidence, top_3_probabilities)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.timestamp,
                record.filename,
                record.predicted_emotion,
                record.confidence,
                record.top3_json(),
            ],
        )?;
        Ok(())
    }

    /// Every record in original insertion order, duplicate filenames included.
    pub fn all(&self) -> Result<Vec<HistoryRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM emotion_history ORDER BY id ASC",
            SELECT_COLUMNS
        ))?;

        let rows = stmt.query_map([], row_to_record)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// The most recently inserted record for `filename`, if any.
    /// Lookup policy is last-write-wins across re-analyses.
    pub fn latest(&self, filename: &str) -> Result<Option<HistoryRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM emotion_history WHERE filename = ?1 ORDER BY id DESC LIMIT 1",
            SELECT_COLUMNS
        ))?;

        match stmt.query_row([filename], row_to_record) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryRecord> {
    let top3: String = row.get(4)?;
    Ok(HistoryRecord {
        timestamp: row.get(0)?,
        filename: row.get(1)?,
        predicted_emotion: row.get(2)?,
        confidence: row.get(3)?,
        top_3_probabilities: HistoryRecord::parse_top3(&top3),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(filename: &str, emotion: &str, confidence: f64) -> HistoryRecord {
        HistoryRecord::new(
            filename.into(),
            emotion.into(),
            confidence,
            vec![(emotion.into(), confidence)],
        )
    }

    #[test]
    fn append_grows_log_by_one_and_preserves_order() {
        let store = HistoryStore::open_in_memory().unwrap();

        store.append(&record("a.wav", "happy", 0.9)).unwrap();
        let before = store.all().unwrap();
        assert_eq!(before.len(), 1);

        store.append(&record("b.wav", "sad", 0.7)).unwrap();
        let after = store.all().unwrap();
        assert_eq!(after.len(), 2);

        // Prior records unchanged and in original order.
        assert_eq!(after[0].filename, "a.wav");
        assert_eq!(after[0].predicted_emotion, "happy");
        assert_eq!(after[1].filename, "b.wav");
    }

    #[test]
    fn duplicate_filenames_are_kept_and_latest_wins() {
        let store = HistoryStore::open_in_memory().unwrap();
        store.append(&record("clip.wav", "sad", 0.5)).unwrap();
        store.append(&record("clip.wav", "happy", 0.8)).unwrap();

        assert_eq!(store.all().unwrap().len(), 2);

        let latest = store.latest("clip.wav").unwrap().unwrap();
        assert_eq!(latest.predicted_emotion, "happy");
        assert!((latest.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn latest_for_unknown_filename_is_none() {
        let store = HistoryStore::open_in_memory().unwrap();
        assert!(store.latest("never-seen.wav").unwrap().is_none());
    }

    #[test]
    fn top3_survives_persistence_in_descending_order() {
        let store = HistoryStore::open_in_memory().unwrap();
        store
            .append(&HistoryRecord::new(
                "clip.wav".into(),
                "happy".into(),
                0.6,
                vec![
                    ("happy".into(), 0.6),
                    ("sad".into(), 0.3),
                    ("neutral".into(), 0.1),
                ],
            ))
            .unwrap();

        let loaded = store.latest("clip.wav").unwrap().unwrap();
        let labels: Vec<&str> = loaded
            .top_3_probabilities
            .iter()
            .map(|(l, _)| l.as_str())
            .collect();
        assert_eq!(labels, vec!["happy", "sad", "neutral"]);
    }
}
