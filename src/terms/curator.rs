use std::io::Write;
use tracing::info;

use crate::error::{Result, TermkeepError};
use super::{EditorLauncher, Prompter, Term, TermDocument};

/// How a curation run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurationOutcome {
    /// Nothing to curate; no menu was shown
    NoTerms,
    AcceptedAll,
    RejectedAll,
    PerTermWalk,
    ExternalEdit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CurationState {
    Idle,
    MenuPresented,
    AcceptedAll,
    RejectedAll,
    PerTermWalk,
    ExternalEdit,
    Done(CurationOutcome),
}

/// Operator review of candidate terms
pub struct TermCurator<'a> {
    prompter: Box<dyn Prompter + 'a>,
    editor: Box<dyn EditorLauncher + 'a>,
}

impl<'a> TermCurator<'a> {
    pub fn new(prompter: Box<dyn Prompter + 'a>, editor: Box<dyn EditorLauncher + 'a>) -> Self {
        Self { prompter, editor }
    }

    /// Run the decision menu over `terms`.
    ///
    /// Decisions are applied to a working copy and committed only when the run
    /// completes, so on error the caller's list is left as it was.
    pub fn curate(&mut self, terms: &mut Vec<Term>) -> Result<CurationOutcome> {
        let mut working = terms.clone();
        let mut state = CurationState::Idle;

        let outcome = loop {
            state = match state {
                CurationState::Idle => {
                    if working.is_empty() {
                        self.prompter.show("No terms to process.")?;
                        CurationState::Done(CurationOutcome::NoTerms)
                    } else {
                        self.present_menu(&working)?;
                        CurationState::MenuPresented
                    }
                }
                CurationState::MenuPresented => {
                    let choice = self.prompter.ask("> ")?;
                    match choice.trim() {
                        "1" => CurationState::AcceptedAll,
                        "2" => CurationState::RejectedAll,
                        "3" => CurationState::PerTermWalk,
                        "4" => CurationState::ExternalEdit,
                        other => return Err(TermkeepError::InvalidChoice(other.to_string())),
                    }
                }
                CurationState::AcceptedAll => {
                    working.iter_mut().for_each(|t| t.preserve = true);
                    CurationState::Done(CurationOutcome::AcceptedAll)
                }
                CurationState::RejectedAll => {
                    working.iter_mut().for_each(|t| t.preserve = false);
                    CurationState::Done(CurationOutcome::RejectedAll)
                }
                CurationState::PerTermWalk => {
                    self.walk_terms(&mut working)?;
                    CurationState::Done(CurationOutcome::PerTermWalk)
                }
                CurationState::ExternalEdit => {
                    working = self.edit_externally(working)?;
                    CurationState::Done(CurationOutcome::ExternalEdit)
                }
                CurationState::Done(outcome) => break outcome,
            };
        };

        *terms = working;
        info!(
            "Curation finished ({:?}): {} of {} terms kept untranslated",
            outcome,
            terms.iter().filter(|t| t.preserve).count(),
            terms.len()
        );
        Ok(outcome)
    }

    fn present_menu(&mut self, terms: &[Term]) -> Result<()> {
        self.prompter
            .show(&format!("Found {} terms that may not need translation:", terms.len()))?;
        self.prompter.show("")?;
        for (i, term) in terms.iter().enumerate() {
            self.prompter
                .show(&format!("{}. {} - {}", i + 1, term.text, term.note))?;
            for context in &term.contexts {
                self.prompter.show(&format!("   Context: {}", context))?;
            }
            self.prompter.show("")?;
        }

        self.prompter.show("Choose an action:")?;
        self.prompter.show("1. Accept all terms as is")?;
        self.prompter.show("2. Reject all terms")?;
        self.prompter.show("3. Process terms interactively")?;
        self.prompter.show("4. Edit terms in text editor")
    }

    fn walk_terms(&mut self, terms: &mut [Term]) -> Result<()> {
        let total = terms.len();

        for (i, term) in terms.iter_mut().enumerate() {
            self.prompter.show("")?;
            self.prompter.show(&format!("Term: {}", term.text))?;
            self.prompter.show(&format!("Description: {}", term.note))?;
            for context in &term.contexts {
                self.prompter.show(&format!("Context: {}", context))?;
            }

            let response = self.prompter.ask("Keep untranslated? [Y/n/e/s]: ")?;
            match response.trim().to_lowercase().as_str() {
                "n" => term.preserve = false,
                "e" => {
                    let text = self.prompter.ask(&format!("New term [{}]: ", term.text))?;
                    if !text.trim().is_empty() {
                        term.text = text.trim().to_string();
                    }
                    let note = self.prompter.ask(&format!("New description [{}]: ", term.note))?;
                    if !note.trim().is_empty() {
                        term.note = note.trim().to_string();
                    }
                    term.preserve = true;
                }
                "s" => {}
                _ => term.preserve = true,
            }

            self.prompter.show(&format!("Processed {}/{} terms", i + 1, total))?;
        }
        Ok(())
    }

    /// Replace the list with whatever the operator saves in the editor.
    fn edit_externally(&mut self, mut terms: Vec<Term>) -> Result<Vec<Term>> {
        terms.iter_mut().for_each(|t| t.preserve = true);
        let json = TermDocument { terms }.to_json_pretty()?;

        let mut file = tempfile::Builder::new()
            .prefix("terms-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| TermkeepError::CurationIo(format!("error creating temp file: {}", e)))?;
        file.write_all(json.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| TermkeepError::CurationIo(format!("error writing temp file: {}", e)))?;

        // Close our handle so the editor owns the file; it is removed on drop
        let path = file.into_temp_path();

        self.prompter
            .show("Opening terms in text editor. Save and exit the editor when finished.")?;
        self.editor.edit(&path)?;

        let edited = std::fs::read_to_string(&path)
            .map_err(|e| TermkeepError::CurationIo(format!("error reading edited file: {}", e)))?;
        let document = TermDocument::from_json(&edited)
            .map_err(|e| TermkeepError::CurationIo(format!("error parsing edited file: {}", e)))?;

        info!("Loaded {} terms from edited file", document.terms.len());
        Ok(document.terms)
    }
}
