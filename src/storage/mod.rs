// Persistence for transcripts, preserved terms and translations
//
// The pipeline only depends on the three-operation Storage trait.
// SqliteStorage is the concrete backend used by the binary and adds the
// listing queries the CLI needs.

pub mod sqlite;

use serde::{Deserialize, Serialize};

pub use sqlite::SqliteStorage;

use crate::error::Result;

/// Storage collaborator used by the translation pipeline
#[cfg_attr(test, mockall::automock)]
pub trait Storage {
    /// Source text of a stored transcription.
    fn get_text(&self, id: i64) -> Result<String>;

    /// Record a term that must stay untranslated; re-saving a term replaces its note.
    fn save_term(&self, term: &str, note: &str) -> Result<()>;

    /// Store a finished translation for a transcription.
    fn save_translation(&self, id: i64, text: &str) -> Result<()>;
}

impl<T: Storage + ?Sized> Storage for &T {
    fn get_text(&self, id: i64) -> Result<String> {
        (**self).get_text(id)
    }

    fn save_term(&self, term: &str, note: &str) -> Result<()> {
        (**self).save_term(term, note)
    }

    fn save_translation(&self, id: i64, text: &str) -> Result<()> {
        (**self).save_translation(id, text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionRecord {
    pub id: i64,
    pub file_name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermRecord {
    pub term: String,
    pub description: String,
    pub added_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub id: i64,
    pub transcription_id: i64,
    pub translated_text: String,
    pub created_at: String,
}
