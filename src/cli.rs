use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database path (overrides config and DATABASE_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store a transcript file in the database
    Import {
        /// Transcript text file
        input: PathBuf,

        /// Translate the transcript right after importing it
        #[arg(short, long)]
        translate: bool,

        /// Directory for <name>_translation.md when --translate is given
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Analyze, curate and translate a stored transcription
    Translate {
        /// Transcription id
        #[arg(short, long)]
        id: i64,

        /// Also write the translation to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Source language override
        #[arg(long)]
        source_lang: Option<String>,

        /// Target language override
        #[arg(long)]
        target_lang: Option<String>,

        /// Hide the chunk progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// List terms kept untranslated
    Terms,

    /// List stored transcriptions
    List,

    /// Print a stored transcription or its translation
    Show {
        /// Transcription id
        #[arg(short, long)]
        id: i64,

        /// Show the latest translation instead of the source text
        #[arg(short, long)]
        translation: bool,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write every stored translation to translation_<id>.md files
    Export {
        /// Output directory
        #[arg(short, long, default_value = "./translations")]
        out: PathBuf,
    },

    /// Write a configuration file with default settings
    InitConfig {
        /// Destination path
        #[arg(short, long, default_value = "termkeep.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_args() {
        let args = Args::parse_from(["termkeep", "-v", "translate", "--id", "3", "--target-lang", "de"]);
        assert!(args.verbose);
        match args.command {
            Commands::Translate { id, target_lang, no_progress, .. } => {
                assert_eq!(id, 3);
                assert_eq!(target_lang.as_deref(), Some("de"));
                assert!(!no_progress);
            }
            _ => panic!("expected translate command"),
        }
    }

    #[test]
    fn test_global_db_after_subcommand() {
        let args = Args::parse_from(["termkeep", "list", "--db", "/tmp/t.db"]);
        assert_eq!(args.db, Some(PathBuf::from("/tmp/t.db")));
        assert!(matches!(args.command, Commands::List));
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["termkeep", "export"]);
        assert!(matches!(args.command, Commands::Export { out } if out == PathBuf::from("./translations")));

        let args = Args::parse_from(["termkeep", "init-config"]);
        assert!(matches!(args.command, Commands::InitConfig { path, force: false } if path == PathBuf::from("termkeep.toml")));
    }
}
