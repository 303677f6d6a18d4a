// Term-preserving translation
//
// A document is segmented into chunks, each chunk is sent as its own
// completion request, and the outputs are joined in order. Chunks are
// translated one after another; the first failure aborts the document.

use std::sync::Arc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::completion::Completer;
use crate::config::TranslateConfig;
use crate::error::{Result, TermkeepError};
use crate::prompts::translate_chunk_prompt;
use crate::segment::{Segmenter, CHUNK_SEPARATOR};

const PROGRESS_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks {msg}";

pub struct Translator {
    completer: Arc<dyn Completer>,
    segmenter: Segmenter,
    source_language: String,
    target_language: String,
    show_progress: bool,
}

impl Translator {
    pub fn new(completer: Arc<dyn Completer>, segmenter: Segmenter, config: &TranslateConfig) -> Self {
        Self {
            completer,
            segmenter,
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            show_progress: config.show_progress,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    /// Translate a single chunk, keeping `preserve_terms` verbatim.
    pub async fn translate_chunk(&self, chunk: &str, preserve_terms: &[String]) -> Result<String> {
        if chunk.trim().is_empty() {
            return Err(TermkeepError::EmptyInput("chunk to translate is blank"));
        }

        let prompt = translate_chunk_prompt(chunk, preserve_terms, &self.source_language, &self.target_language);
        let content = self.completer.complete(&prompt).await?;
        let content = content.trim();
        if content.is_empty() {
            return Err(TermkeepError::MalformedResponse(
                "model returned an empty translation".to_string(),
            ));
        }
        Ok(content.to_string())
    }

    /// Translate a whole document chunk by chunk and join the results.
    pub async fn translate_text(&self, text: &str, preserve_terms: &[String]) -> Result<String> {
        let chunks = self.segmenter.segment(text)?;
        let total = chunks.len();
        info!(
            "Translating {} chunks from {} to {} ({} preserved terms)",
            total,
            self.source_language,
            self.target_language,
            preserve_terms.len()
        );

        let progress = self.progress_bar(total);
        let mut translated = Vec::with_capacity(total);

        for (i, chunk) in chunks.iter().enumerate() {
            debug!("Translating chunk {}/{} ({} chars)", i + 1, total, chunk.text.len());
            match self.translate_chunk(&chunk.text, preserve_terms).await {
                Ok(text) => {
                    translated.push(text);
                    progress.inc(1);
                }
                Err(e) => {
                    progress.abandon_with_message(format!("failed at chunk {}", i + 1));
                    return Err(TermkeepError::ChunkFailed {
                        position: i + 1,
                        total,
                        source: Box::new(e),
                    });
                }
            }
        }

        progress.finish_with_message("done");
        info!("Translation complete: {} chunks", total);
        Ok(translated.join(CHUNK_SEPARATOR))
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb
    }
}
