use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, TermkeepError};

/// Environment variable holding the completion backend API key
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
/// Environment variable overriding the SQLite database path
pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";
/// Environment variable overriding the completion model
pub const MODEL_ENV: &str = "TERMKEEP_MODEL";

fn default_max_terms() -> usize {
    15
}

fn default_show_progress() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub completion: CompletionConfig,
    pub translate: TranslateConfig,
    pub segment: SegmentConfig,
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub curation: CurationConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Base URL of the chat-completion API
    pub endpoint: String,
    /// Bearer token; usually supplied through the environment
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Total attempts per prompt, including the first one
    pub max_attempts: u32,
    /// Linear backoff step; attempt N waits N * backoff_ms
    pub backoff_ms: u64,
    /// Value of the HTTP-Referer header some gateways use for attribution
    #[serde(default)]
    pub referer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Source language code or name
    pub source_language: String,
    /// Target language code or name
    pub target_language: String,
    /// Draw a progress bar while chunks are translated
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Paragraphs grouped into one translation request
    pub max_paragraphs_per_chunk: usize,
    /// Sentences grouped into one paragraph by the sentence fallback
    pub max_sentences_per_paragraph: usize,
    /// Minimum trimmed length (in characters) before sentence splitting kicks in
    pub sentence_fallback_threshold: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Upper bound on candidate terms requested from the model
    #[serde(default = "default_max_terms")]
    pub max_terms: usize,
    /// Treat an empty term list as a malformed response
    #[serde(default)]
    pub require_terms: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurationConfig {
    /// Editor command used for bulk edits; falls back to $EDITOR, $VISUAL, then a platform default
    #[serde(default)]
    pub editor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            completion: CompletionConfig::default(),
            translate: TranslateConfig::default(),
            segment: SegmentConfig::default(),
            analysis: AnalysisConfig::default(),
            curation: CurationConfig::default(),
            storage: StorageConfig {
                database_path: PathBuf::from("./transcriptions.db"),
            },
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://openrouter.ai/api/v1".to_string(),
            api_key: String::new(),
            model: "meta-llama/llama-4-maverick".to_string(),
            timeout_secs: 300,
            max_attempts: 3,
            backoff_ms: 500,
            referer: None,
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            source_language: "en".to_string(),
            target_language: "ru".to_string(),
            show_progress: true,
        }
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_paragraphs_per_chunk: 5,
            max_sentences_per_paragraph: 5,
            sentence_fallback_threshold: 1000,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_terms: default_max_terms(),
            require_terms: false,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TermkeepError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| TermkeepError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TermkeepError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TermkeepError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup; empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup(API_KEY_ENV) {
            self.completion.api_key = key;
        }
        if let Some(path) = lookup(DATABASE_PATH_ENV) {
            self.storage.database_path = PathBuf::from(path);
        }
        if let Some(model) = lookup(MODEL_ENV) {
            self.completion.model = model;
        }
    }

    /// Check the settings the pipeline cannot run without.
    pub fn validate(&self) -> Result<()> {
        if self.completion.max_attempts == 0 {
            return Err(TermkeepError::Config("completion.max_attempts must be at least 1".to_string()));
        }
        if self.segment.max_paragraphs_per_chunk == 0 || self.segment.max_sentences_per_paragraph == 0 {
            return Err(TermkeepError::Config("segment group sizes must be at least 1".to_string()));
        }
        if self.translate.source_language.trim().is_empty() || self.translate.target_language.trim().is_empty() {
            return Err(TermkeepError::Config("source and target languages are required".to_string()));
        }
        Ok(())
    }
}
