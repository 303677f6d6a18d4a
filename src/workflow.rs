use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};

use crate::completion::Completer;
use crate::config::Config;
use crate::error::{Result, TermkeepError};
use crate::segment::Segmenter;
use crate::storage::{SqliteStorage, Storage};
use crate::terms::{preserved_terms, CurationOutcome, Term, TermAnalyzer, TermCurator};
use crate::translate::Translator;

/// What a pipeline run produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub transcription_id: i64,
    /// Curated terms, including the ones the operator chose to translate
    pub terms: Vec<Term>,
    pub outcome: CurationOutcome,
    pub translation: String,
}

impl PipelineReport {
    pub fn preserved_count(&self) -> usize {
        self.terms.iter().filter(|t| t.preserve).count()
    }
}

/// Load, analyze, curate, translate and store one transcription
pub struct TranslationPipeline<'a, S: Storage> {
    analyzer: TermAnalyzer,
    curator: TermCurator<'a>,
    translator: Translator,
    storage: S,
}

impl<'a, S: Storage> TranslationPipeline<'a, S> {
    pub fn new(analyzer: TermAnalyzer, curator: TermCurator<'a>, translator: Translator, storage: S) -> Self {
        Self {
            analyzer,
            curator,
            translator,
            storage,
        }
    }

    /// Wire analyzer and translator to one completion backend using `config`.
    pub fn from_config(config: &Config, completer: Arc<dyn Completer>, curator: TermCurator<'a>, storage: S) -> Self {
        let analyzer = TermAnalyzer::new(Arc::clone(&completer), &config.translate, &config.analysis);
        let translator = Translator::new(completer, Segmenter::new(config.segment.clone()), &config.translate);
        Self::new(analyzer, curator, translator, storage)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub async fn process_transcription(&mut self, id: i64) -> Result<PipelineReport> {
        info!("Processing transcription {}", id);

        let text = self
            .storage
            .get_text(id)
            .map_err(|e| e.context("error getting transcription"))?;

        let mut terms = self
            .analyzer
            .analyze_terms(&text)
            .await
            .map_err(|e| e.context("error analyzing terms"))?;

        let outcome = self
            .curator
            .curate(&mut terms)
            .map_err(|e| e.context("error processing terms"))?;

        // No transaction: terms saved before a later failure stay saved
        for term in terms.iter().filter(|t| t.preserve) {
            self.storage
                .save_term(&term.text, &term.note)
                .map_err(|e| e.context(format!("error saving term {}", term.text)))?;
        }

        let preserved = preserved_terms(&terms);
        info!("Translating with {} preserved terms", preserved.len());

        let translation = self
            .translator
            .translate_text(&text, &preserved)
            .await
            .map_err(|e| e.context("error translating text"))?;

        self.storage
            .save_translation(id, &translation)
            .map_err(|e| e.context("error saving translation"))?;

        info!("Transcription {} translated ({} chars)", id, translation.chars().count());
        Ok(PipelineReport {
            transcription_id: id,
            terms,
            outcome,
            translation,
        })
    }
}

/// Read a UTF-8 transcript file into storage and return its id.
pub async fn import_transcript<P: AsRef<Path>>(storage: &SqliteStorage, path: P) -> Result<i64> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).await.map_err(|e| {
        TermkeepError::Io(e).context(format!("error reading transcript {}", path.display()))
    })?;
    if text.trim().is_empty() {
        return Err(TermkeepError::EmptyInput("transcript file is blank"));
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| TermkeepError::Config(format!("invalid transcript path: {}", path.display())))?;

    let id = storage.save_transcription(&file_name, &text)?;
    info!("Imported {} as transcription {}", path.display(), id);
    Ok(id)
}

pub async fn save_transcription_to_file<S: Storage, P: AsRef<Path>>(storage: &S, id: i64, path: P) -> Result<()> {
    let text = storage
        .get_text(id)
        .map_err(|e| e.context("error retrieving transcription"))?;
    write_text(path.as_ref(), &text).await?;
    info!("Transcription saved to {}", path.as_ref().display());
    Ok(())
}

pub async fn save_translation_to_file<P: AsRef<Path>>(storage: &SqliteStorage, id: i64, path: P) -> Result<()> {
    let text = storage
        .get_translation(id)
        .map_err(|e| e.context("error retrieving translation"))?;
    write_text(path.as_ref(), &text).await?;
    info!("Translation saved to {}", path.as_ref().display());
    Ok(())
}

/// Write every stored translation to `<dir>/translation_<id>.md`.
///
/// Files that fail to write are logged and skipped; the written paths are returned.
pub async fn export_translations<P: AsRef<Path>>(storage: &SqliteStorage, dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).await?;

    let translations = storage.list_translations()?;
    info!("Found {} translations", translations.len());

    let mut written = Vec::with_capacity(translations.len());
    for translation in translations {
        let path = dir.join(format!("translation_{}.md", translation.id));
        match fs::write(&path, &translation.translated_text).await {
            Ok(()) => {
                info!("Saved {}", path.display());
                written.push(path);
            }
            Err(e) => warn!("Error saving {}: {}", path.display(), e),
        }
    }
    Ok(written)
}

/// `<stem>_<suffix><ext>` for an input path, e.g. `talk.txt` -> `talk_translation.md`.
pub fn generate_file_name<P: AsRef<Path>>(input: P, suffix: &str, ext: &str) -> String {
    let stem = input
        .as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("{}_{}{}", stem, suffix, ext)
}

async fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| TermkeepError::Io(e).context("error creating output directory"))?;
    }
    fs::write(path, text)
        .await
        .map_err(|e| TermkeepError::Io(e).context(format!("error writing {}", path.display())))
}
