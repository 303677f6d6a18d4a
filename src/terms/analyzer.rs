use std::sync::Arc;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::completion::Completer;
use crate::completion::client::fragment;
use crate::config::{AnalysisConfig, TranslateConfig};
use crate::error::{Result, TermkeepError};
use crate::prompts::analyze_terms_prompt;
use super::{null_as_default, Term};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermCategory {
    Technical,
    Name,
    Acronym,
    Unit,
    #[serde(other)]
    Other,
}

/// One term as returned by the model, before curation
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateTerm {
    pub term: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default)]
    pub category: Option<TermCategory>,
    #[serde(default)]
    pub context: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TermAnalysis {
    pub terms: Vec<CandidateTerm>,
}

pub struct TermAnalyzer {
    completer: Arc<dyn Completer>,
    source_language: String,
    target_language: String,
    max_terms: usize,
    require_terms: bool,
}

impl TermAnalyzer {
    pub fn new(completer: Arc<dyn Completer>, translate: &TranslateConfig, analysis: &AnalysisConfig) -> Self {
        Self {
            completer,
            source_language: translate.source_language.clone(),
            target_language: translate.target_language.clone(),
            max_terms: analysis.max_terms,
            require_terms: analysis.require_terms,
        }
    }

    /// Ask the backend for terms that should stay untranslated.
    ///
    /// Every returned term starts out with `preserve = true`.
    pub async fn analyze_terms(&self, text: &str) -> Result<Vec<Term>> {
        if text.trim().is_empty() {
            return Err(TermkeepError::EmptyInput("text to analyze is blank"));
        }

        info!("Analyzing text for specialized terms...");
        let prompt = analyze_terms_prompt(text, &self.source_language, &self.target_language, self.max_terms);
        let content = self.completer.complete(&prompt).await?;
        debug!("Raw analysis response: {}", content);

        let analysis = parse_term_analysis(&content)?;
        if analysis.terms.is_empty() && self.require_terms {
            return Err(TermkeepError::MalformedResponse("no terms found in analysis".to_string()));
        }

        let mut candidates: Vec<CandidateTerm> = analysis
            .terms
            .into_iter()
            .filter(|c| !c.term.trim().is_empty())
            .collect();

        if candidates.len() > self.max_terms {
            warn!(
                "Model returned {} terms, keeping the first {}",
                candidates.len(),
                self.max_terms
            );
            candidates.truncate(self.max_terms);
        }

        let terms: Vec<Term> = candidates
            .into_iter()
            .map(|c| {
                debug!("Candidate term {:?} ({:?})", c.term, c.category);
                Term::new(c.term.trim(), c.description.trim())
                    .with_contexts(c.context.unwrap_or_default())
            })
            .collect();

        info!("Found {} candidate terms", terms.len());
        Ok(terms)
    }
}

/// Parse the term list out of raw model output.
pub fn parse_term_analysis(content: &str) -> Result<TermAnalysis> {
    let json = extract_json(content).ok_or_else(|| {
        TermkeepError::MalformedResponse(format!("no JSON found in response: {}", fragment(content)))
    })?;

    serde_json::from_str(json).map_err(|e| {
        TermkeepError::MalformedResponse(format!("error parsing analysis: {} (JSON: {})", e, fragment(json)))
    })
}

/// Locate a JSON object in model output.
///
/// Tried in order: a ```json fenced block, a generic fenced block, then the
/// span from the first `{` to the last `}`.
pub fn extract_json(content: &str) -> Option<&str> {
    if let Some(block) = fenced_block(content, "```json") {
        return Some(block);
    }
    if let Some(block) = fenced_block(content, "```") {
        return Some(block);
    }

    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| content[start..=end].trim())
}

fn fenced_block<'a>(content: &'a str, fence: &str) -> Option<&'a str> {
    let start = content.find(fence)? + fence.len();
    let rest = &content[start..];
    let end = rest.find("```").unwrap_or(rest.len());
    let block = strip_language_tag(&rest[..end]).trim();

    block.starts_with('{').then_some(block)
}

fn strip_language_tag(block: &str) -> &str {
    match block.split_once('\n') {
        Some((first, rest)) if !first.trim_start().starts_with('{') => rest,
        _ => block,
    }
}
