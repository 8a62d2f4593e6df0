use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::app_dirs::AppDirs;
use crate::config::TestMode;
use crate::controller::ResultRecord;
use crate::error::Result;
use crate::text::ContentKind;

/// A stored result with when and what it was typed against
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Local>,
    pub kind: ContentKind,
    pub record: ResultRecord,
}

/// Finished tests, persisted in SQLite
#[derive(Debug)]
pub struct ResultStore {
    conn: Connection,
}

impl ResultStore {
    /// Opens the store under the state dir, `keyra_results.db` in the cwd without one
    pub fn open_default() -> Result<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("keyra_results.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                mode TEXT NOT NULL,
                kind TEXT NOT NULL,
                wpm INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                elapsed_secs REAL NOT NULL,
                total_chars INTEGER NOT NULL,
                error_count INTEGER NOT NULL,
                consistency INTEGER NOT NULL
            )
            "#,
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_results_mode ON results(mode)",
            [],
        )?;
        Ok(Self { conn })
    }

    pub fn save(&self, record: &ResultRecord, kind: ContentKind) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO results
            (timestamp, mode, kind, wpm, accuracy, elapsed_secs, total_chars, error_count, consistency)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                Local::now().to_rfc3339(),
                record.mode.to_string(),
                kind.to_string(),
                record.wpm,
                record.accuracy_pct,
                record.elapsed_secs,
                record.total_chars as i64,
                record.error_count as i64,
                record.consistency_pct,
            ],
        )?;
        log::debug!("saved {} result: {} wpm", record.mode, record.wpm);
        Ok(())
    }

    /// Most recent first
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT timestamp, mode, kind, wpm, accuracy, elapsed_secs, total_chars, error_count, consistency
            FROM results
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let timestamp: String = row.get(0)?;
            let mode: String = row.get(1)?;
            let kind: String = row.get(2)?;
            let total_chars: i64 = row.get(6)?;
            let error_count: i64 = row.get(7)?;

            let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                .map(|dt| dt.with_timezone(&Local))
                .unwrap_or_else(|_| Local::now());
            Ok(HistoryEntry {
                timestamp,
                kind: ContentKind::from_str(&kind).unwrap_or(ContentKind::Prose),
                record: ResultRecord {
                    wpm: row.get(3)?,
                    accuracy_pct: row.get(4)?,
                    elapsed_secs: row.get(5)?,
                    total_chars: total_chars.max(0) as usize,
                    error_count: error_count.max(0) as usize,
                    consistency_pct: row.get(8)?,
                    mode: TestMode::from_str(&mode).unwrap_or(TestMode::Time),
                },
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Highest wpm ever recorded in `mode`
    pub fn best_wpm(&self, mode: TestMode) -> Result<Option<u32>> {
        let best = self
            .conn
            .query_row(
                "SELECT MAX(wpm) FROM results WHERE mode = ?1",
                params![mode.to_string()],
                |row| row.get::<_, Option<u32>>(0),
            )
            .optional()?;
        Ok(best.flatten())
    }
}
