use std::collections::VecDeque;
use std::io::{BufRead, Stdin, Stdout, Write};

use crate::error::{Result, TermkeepError};

/// Line-oriented request/response channel to the operator
pub trait Prompter {
    /// Print one line of information.
    fn show(&mut self, text: &str) -> Result<()>;

    /// Print `prompt` and read one line of response, without the line terminator.
    fn ask(&mut self, prompt: &str) -> Result<String>;
}

impl<P: Prompter + ?Sized> Prompter for &mut P {
    fn show(&mut self, text: &str) -> Result<()> {
        (**self).show(text)
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        (**self).ask(prompt)
    }
}

/// Prompter over any reader/writer pair; `stdio()` gives the terminal one
pub struct ConsolePrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsolePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl ConsolePrompter<std::io::StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        let stdin: Stdin = std::io::stdin();
        Self::new(stdin.lock(), std::io::stdout())
    }
}

fn io_error(action: &str, e: std::io::Error) -> TermkeepError {
    TermkeepError::CurationIo(format!("error {}: {}", action, e))
}

impl<R: BufRead, W: Write> Prompter for ConsolePrompter<R, W> {
    fn show(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text).map_err(|e| io_error("writing output", e))
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{}", prompt).map_err(|e| io_error("writing prompt", e))?;
        self.output.flush().map_err(|e| io_error("writing prompt", e))?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| io_error("reading response", e))?;
        if read == 0 {
            return Err(TermkeepError::CurationIo(
                "error reading response: unexpected end of input".to_string(),
            ));
        }

        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Pre-recorded answers; everything shown or asked is kept in a transcript
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    transcript: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
        }
    }

    /// Lines shown and prompts asked, in order
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }
}

impl Prompter for ScriptedPrompter {
    fn show(&mut self, text: &str) -> Result<()> {
        self.transcript.push(text.to_string());
        Ok(())
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        self.transcript.push(prompt.to_string());
        self.answers.pop_front().ok_or_else(|| {
            TermkeepError::CurationIo(format!("no scripted answer left for prompt {:?}", prompt))
        })
    }
}
