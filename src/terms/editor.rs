use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};

use crate::error::{Result, TermkeepError};

/// Something that lets the operator edit a file and returns once they are done
#[cfg_attr(test, mockall::automock)]
pub trait EditorLauncher {
    fn edit(&self, path: &Path) -> Result<()>;
}

/// Editor program plus leading arguments; the file path is appended last
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl EditorCommand {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Split a command string such as `code --wait` on whitespace.
    pub fn parse(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next()?;
        Some(parts.fold(Self::new(program), |cmd, arg| cmd.arg(arg)))
    }

    /// Resolve from the configured override, `$EDITOR`, `$VISUAL`, then the platform default.
    pub fn resolve(configured: Option<&str>) -> Self {
        Self::resolve_with(configured, |key| std::env::var(key).ok(), std::env::consts::OS)
    }

    pub fn resolve_with<F>(configured: Option<&str>, lookup: F, os: &str) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        configured
            .and_then(Self::parse)
            .or_else(|| lookup("EDITOR").as_deref().and_then(Self::parse))
            .or_else(|| lookup("VISUAL").as_deref().and_then(Self::parse))
            .unwrap_or_else(|| Self::platform_default(os))
    }

    pub fn platform_default(os: &str) -> Self {
        match os {
            "windows" => Self::new("notepad"),
            // -W blocks until TextEdit quits
            "macos" => Self::new("open").arg("-W").arg("-a").arg("TextEdit"),
            _ => Self::new("nano"),
        }
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs an editor process with inherited stdio and waits for it to exit
pub struct CommandEditor {
    command: EditorCommand,
}

impl CommandEditor {
    pub fn new(command: EditorCommand) -> Self {
        Self { command }
    }

    pub fn from_config(configured: Option<&str>) -> Self {
        Self::new(EditorCommand::resolve(configured))
    }
}

impl EditorLauncher for CommandEditor {
    fn edit(&self, path: &Path) -> Result<()> {
        info!("Opening {} in {}", path.display(), self.command.display());
        debug!("Editor command: {} {:?} {}", self.command.program, self.command.args, path.display());

        let status = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg(path)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| {
                TermkeepError::CurationIo(format!("error running editor {}: {}", self.command.program, e))
            })?;

        if !status.success() {
            return Err(TermkeepError::CurationIo(format!(
                "editor {} exited with {}",
                self.command.program, status
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |key| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_resolution_order() {
        let both = env(&[("EDITOR", "vim"), ("VISUAL", "code --wait")]);
        assert_eq!(EditorCommand::resolve_with(Some("hx"), &both, "linux"), EditorCommand::new("hx"));
        assert_eq!(EditorCommand::resolve_with(None, &both, "linux"), EditorCommand::new("vim"));

        let visual = env(&[("EDITOR", "  "), ("VISUAL", "code --wait")]);
        assert_eq!(
            EditorCommand::resolve_with(None, &visual, "linux"),
            EditorCommand::new("code").arg("--wait")
        );
    }

    #[test]
    fn test_platform_defaults() {
        let none = env(&[]);
        assert_eq!(EditorCommand::resolve_with(None, &none, "windows").program, "notepad");
        assert_eq!(EditorCommand::resolve_with(None, &none, "macos").display(), "open -W -a TextEdit");
        assert_eq!(EditorCommand::resolve_with(None, &none, "linux").program, "nano");
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert_eq!(EditorCommand::parse("   "), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status_is_checked() {
        let path = std::env::temp_dir();
        assert!(CommandEditor::new(EditorCommand::new("true")).edit(&path).is_ok());

        let err = CommandEditor::new(EditorCommand::new("false")).edit(&path).unwrap_err();
        assert!(matches!(err, TermkeepError::CurationIo(msg) if msg.contains("exited with")));
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let editor = CommandEditor::new(EditorCommand::new("termkeep-no-such-editor"));
        let err = editor.edit(Path::new("terms.json")).unwrap_err();
        assert!(matches!(err, TermkeepError::CurationIo(msg) if msg.contains("error running editor")));
    }
}
