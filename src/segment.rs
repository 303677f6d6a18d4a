//! Text segmentation into translation-sized chunks.
//!
//! Paragraphs are found with a cascade of split strategies, each tried only
//! while the previous one left the text as a single unit. Paragraphs are then
//! grouped into chunks that bound the size of each completion request.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SegmentConfig;
use crate::error::{Result, TermkeepError};

/// Separator between paragraphs inside a chunk and between translated chunks
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// Abbreviations whose trailing period does not end a sentence
pub const ABBREVIATIONS: [&str; 7] = ["Mr.", "Mrs.", "Dr.", "Prof.", "i.e.", "e.g.", "vs."];

static BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\r?\n){2,}").expect("blank line pattern is valid"));

/// A contiguous group of paragraphs sent as one translation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

/// Paragraph split strategies, in the order they are attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStrategy {
    /// Split on two or more consecutive newlines
    BlankLines,
    /// Join runs of non-blank lines, breaking at whitespace-only lines
    LineRuns,
    /// Naive sentence splitting for long unbroken text
    Sentences,
}

impl SplitStrategy {
    pub const CASCADE: [SplitStrategy; 3] = [Self::BlankLines, Self::LineRuns, Self::Sentences];

    pub fn name(&self) -> &'static str {
        match self {
            Self::BlankLines => "blank-lines",
            Self::LineRuns => "line-runs",
            Self::Sentences => "sentences",
        }
    }

    /// Split `text` into paragraphs, or `None` when the strategy does not apply.
    pub fn split(&self, text: &str, config: &SegmentConfig) -> Option<Vec<String>> {
        match self {
            Self::BlankLines => Some(split_blank_lines(text)),
            Self::LineRuns => Some(split_line_runs(text)),
            Self::Sentences => {
                if text.trim().chars().count() <= config.sentence_fallback_threshold {
                    return None;
                }
                Some(group_sentences(
                    split_sentences(text),
                    config.max_sentences_per_paragraph,
                ))
            }
        }
    }
}

fn insufficient_granularity(units: &[String]) -> bool {
    units.len() <= 1
}

pub struct Segmenter {
    config: SegmentConfig,
}

impl Segmenter {
    pub fn new(config: SegmentConfig) -> Self {
        Self { config }
    }

    /// Split text into ordered, non-empty chunks.
    pub fn segment(&self, text: &str) -> Result<Vec<Chunk>> {
        if text.trim().is_empty() {
            return Err(TermkeepError::EmptyInput("text to segment is blank"));
        }

        let paragraphs = self.paragraphs(text);
        if paragraphs.is_empty() {
            return Err(TermkeepError::EmptyInput("text to segment is blank"));
        }

        let max = self.config.max_paragraphs_per_chunk.max(1);
        let chunks: Vec<Chunk> = paragraphs
            .chunks(max)
            .enumerate()
            .map(|(index, group)| Chunk {
                index,
                text: group.join(CHUNK_SEPARATOR),
            })
            .collect();

        debug!(
            "Segmented {} paragraphs into {} chunks (max {} per chunk)",
            paragraphs.len(),
            chunks.len(),
            max
        );
        Ok(chunks)
    }

    /// Paragraph-level units produced by the strategy cascade.
    pub fn paragraphs(&self, text: &str) -> Vec<String> {
        let mut units = Vec::new();

        for strategy in SplitStrategy::CASCADE {
            match strategy.split(text, &self.config) {
                Some(split) => {
                    debug!("Split strategy {} produced {} units", strategy.name(), split.len());
                    units = split;
                }
                None => debug!("Split strategy {} not applicable", strategy.name()),
            }

            if !insufficient_granularity(&units) {
                break;
            }
        }

        units
    }
}

/// Join chunk texts back together in index order.
pub fn join_chunks(chunks: &[Chunk]) -> String {
    let mut ordered: Vec<&Chunk> = chunks.iter().collect();
    ordered.sort_by_key(|c| c.index);
    ordered
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(CHUNK_SEPARATOR)
}

fn split_blank_lines(text: &str) -> Vec<String> {
    BLANK_LINES
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn split_line_runs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
            continue;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(trimmed);
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}

/// Split after `.`, `!` or `?` followed by a space, except after known abbreviations.
///
/// Abbreviations outside [`ABBREVIATIONS`] ("etc.", "approx.") still end a sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut sentences = Vec::new();
    let mut start = 0;

    for (i, ch) in text.char_indices() {
        if !matches!(ch, '.' | '!' | '?') || bytes.get(i + 1) != Some(&b' ') {
            continue;
        }
        let candidate = &text[start..=i];
        if ch == '.' && ABBREVIATIONS.iter().any(|abbr| candidate.ends_with(abbr)) {
            continue;
        }
        push_trimmed(&mut sentences, candidate);
        start = i + 2;
    }

    if start < text.len() {
        push_trimmed(&mut sentences, &text[start..]);
    }
    sentences
}

fn push_trimmed(out: &mut Vec<String>, s: &str) {
    let trimmed = s.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn group_sentences(sentences: Vec<String>, per_paragraph: usize) -> Vec<String> {
    sentences
        .chunks(per_paragraph.max(1))
        .map(|group| group.join(" "))
        .collect()
}
