// Untranslatable term handling
//
// - analyzer: ask the completion backend for candidate terms
// - curator: operator decision state machine over the candidates
// - prompter / editor: the I/O ports the curator is driven through

pub mod analyzer;
pub mod curator;
pub mod editor;
pub mod prompter;

use serde::{Deserialize, Deserializer, Serialize};

pub use analyzer::*;
pub use curator::*;
pub use editor::*;
pub use prompter::*;

use crate::error::Result;

/// A surface string the pipeline may keep untranslated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    #[serde(rename = "term")]
    pub text: String,
    #[serde(rename = "description", default, deserialize_with = "null_as_default")]
    pub note: String,
    #[serde(
        rename = "context",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub contexts: Vec<String>,
    #[serde(rename = "keep_untranslated", default, deserialize_with = "null_as_default")]
    pub preserve: bool,
}

impl Term {
    /// New term marked for preservation
    pub fn new<S1: Into<String>, S2: Into<String>>(text: S1, note: S2) -> Self {
        Self {
            text: text.into(),
            note: note.into(),
            contexts: Vec::new(),
            preserve: true,
        }
    }

    pub fn with_contexts(mut self, contexts: Vec<String>) -> Self {
        self.contexts = contexts;
        self
    }
}

/// The `{"terms": [...]}` document exchanged with the external editor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermDocument {
    pub terms: Vec<Term>,
}

impl TermDocument {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Reads a JSON `null` as the field's zero value
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Texts of the terms marked for preservation, in list order
pub fn preserved_terms(terms: &[Term]) -> Vec<String> {
    terms
        .iter()
        .filter(|t| t.preserve)
        .map(|t| t.text.clone())
        .collect()
}
