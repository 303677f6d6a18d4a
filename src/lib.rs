//! termkeep - term-preserving chunked translation
//!
//! Stored transcripts are analyzed for terms that should stay untranslated,
//! the operator curates that list, and the text is translated chunk by chunk
//! through an OpenAI-compatible completion API with the curated terms kept
//! verbatim.

pub mod cli;
pub mod completion;
pub mod config;
pub mod error;
pub mod prompts;
pub mod segment;
pub mod storage;
pub mod terms;
pub mod translate;
pub mod workflow;
