use std::path::{Path, PathBuf};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Result, TermkeepError};
use super::{Storage, TermRecord, TranscriptionRecord, TranslationRecord};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS transcriptions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_name TEXT NOT NULL,
    transcript_text TEXT NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS untranslatable_terms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    term TEXT NOT NULL UNIQUE,
    description TEXT,
    added_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS translations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    transcription_id INTEGER,
    translated_text TEXT NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (transcription_id) REFERENCES transcriptions(id)
);

CREATE INDEX IF NOT EXISTS idx_translations_transcription ON translations(transcription_id);
"#;

/// SQLite-backed storage; the schema is created on open
pub struct SqliteStorage {
    path: PathBuf,
    conn: Connection,
}

impl SqliteStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                TermkeepError::Storage(format!("error creating database directory {}: {}", parent.display(), e))
            })?;
        }

        info!("Opening database at: {}", path.display());
        let conn = Connection::open(&path)
            .map_err(|e| TermkeepError::Storage(format!("error opening database {}: {}", path.display(), e)))?;

        Self::initialize(path, conn)
    }

    /// In-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        debug!("Creating in-memory database");
        let conn = Connection::open_in_memory()?;
        Self::initialize(PathBuf::from(":memory:"), conn)
    }

    fn initialize(path: PathBuf, conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| TermkeepError::Storage(format!("error creating schema: {}", e)))?;
        Ok(Self { path, conn })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store a new transcript and return its id.
    pub fn save_transcription(&self, file_name: &str, text: &str) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO transcriptions (file_name, transcript_text) VALUES (?1, ?2)",
                params![file_name, text],
            )
            .map_err(|e| TermkeepError::Storage(format!("error saving transcription: {}", e)))?;

        let id = self.conn.last_insert_rowid();
        debug!("Saved transcription {} ({}, {} chars)", id, file_name, text.chars().count());
        Ok(id)
    }

    /// Most recent translation stored for a transcription.
    pub fn get_translation(&self, transcription_id: i64) -> Result<String> {
        self.conn
            .query_row(
                "SELECT translated_text FROM translations WHERE transcription_id = ?1 ORDER BY id DESC LIMIT 1",
                [transcription_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| TermkeepError::Storage(format!("error retrieving translation: {}", e)))?
            .ok_or_else(|| {
                TermkeepError::Storage(format!("no translation found for transcription {}", transcription_id))
            })
    }

    pub fn list_terms(&self) -> Result<Vec<TermRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT term, description, added_at FROM untranslatable_terms ORDER BY term COLLATE NOCASE")?;

        let rows = stmt.query_map([], |row| {
            Ok(TermRecord {
                term: row.get(0)?,
                description: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                added_at: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            })
        })?;

        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn list_translations(&self) -> Result<Vec<TranslationRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, transcription_id, translated_text, created_at FROM translations ORDER BY id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(TranslationRecord {
                id: row.get(0)?,
                transcription_id: row.get(1)?,
                translated_text: row.get(2)?,
                created_at: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            })
        })?;

        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn list_transcriptions(&self) -> Result<Vec<TranscriptionRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, file_name, created_at FROM transcriptions ORDER BY id")?;

        let rows = stmt.query_map([], |row| {
            Ok(TranscriptionRecord {
                id: row.get(0)?,
                file_name: row.get(1)?,
                created_at: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            })
        })?;

        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

impl Storage for SqliteStorage {
    fn get_text(&self, id: i64) -> Result<String> {
        self.conn
            .query_row(
                "SELECT transcript_text FROM transcriptions WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| TermkeepError::Storage(format!("error retrieving transcription: {}", e)))?
            .ok_or_else(|| TermkeepError::Storage(format!("transcription {} not found", id)))
    }

    fn save_term(&self, term: &str, note: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO untranslatable_terms (term, description) VALUES (?1, ?2)",
                params![term, note],
            )
            .map_err(|e| TermkeepError::Storage(format!("error saving term: {}", e)))?;
        Ok(())
    }

    fn save_translation(&self, id: i64, text: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO translations (transcription_id, translated_text) VALUES (?1, ?2)",
                params![id, text],
            )
            .map_err(|e| TermkeepError::Storage(format!("error saving translation: {}", e)))?;
        Ok(())
    }
}
