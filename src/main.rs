//! termkeep - term-preserving chunked translation of stored transcripts
//!
//! Entry point: loads configuration, sets up logging and dispatches the
//! subcommands over the SQLite store.

use std::path::Path;
use std::sync::Arc;
use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use termkeep::cli::{Args, Commands};
use termkeep::completion::{Completer, CompletionClient};
use termkeep::config::{Config, API_KEY_ENV};
use termkeep::storage::{SqliteStorage, Storage};
use termkeep::terms::{CommandEditor, ConsolePrompter, TermCurator};
use termkeep::workflow::{
    export_translations, generate_file_name, import_transcript, save_transcription_to_file,
    save_translation_to_file, PipelineReport, TranslationPipeline,
};

const DEFAULT_CONFIG_FILE: &str = "termkeep.toml";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    setup_logging(args.verbose)?;
    info!("Starting termkeep v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(args.config.as_deref())?;
    config.apply_env();
    if let Some(db) = &args.db {
        config.storage.database_path = db.clone();
    }
    config.validate()?;

    match args.command {
        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            config.save_to_file(&path)?;
            println!("Configuration written to {}", path.display());
        }
        Commands::Import { input, translate, output_dir } => {
            let storage = open_storage(&config)?;
            let id = import_transcript(&storage, &input).await?;
            println!("Transcription saved with ID: {}", id);

            if translate {
                let report = run_pipeline(&config, &storage, id).await?;
                print_report(&report);

                if let Some(dir) = output_dir {
                    let path = dir.join(generate_file_name(&input, "translation", ".md"));
                    save_translation_to_file(&storage, id, &path).await?;
                    println!("Translation saved to {}", path.display());
                }
            }
        }
        Commands::Translate { id, output, source_lang, target_lang, no_progress } => {
            if let Some(lang) = source_lang {
                config.translate.source_language = lang;
            }
            if let Some(lang) = target_lang {
                config.translate.target_language = lang;
            }
            if no_progress {
                config.translate.show_progress = false;
            }
            config.validate()?;

            let storage = open_storage(&config)?;
            let report = run_pipeline(&config, &storage, id).await?;
            print_report(&report);

            if let Some(path) = output {
                save_translation_to_file(&storage, id, &path).await?;
                println!("Translation saved to {}", path.display());
            }
        }
        Commands::Terms => {
            let terms = open_storage(&config)?.list_terms()?;
            if terms.is_empty() {
                println!("No untranslatable terms stored.");
            } else {
                println!("{:<30} {:<50}", "Term", "Description");
                println!("{}", "-".repeat(80));
                for term in terms {
                    println!("{:<30} {:<50}", term.term, term.description);
                }
            }
        }
        Commands::List => {
            let storage = open_storage(&config)?;
            let transcriptions = storage.list_transcriptions()?;
            if transcriptions.is_empty() {
                println!("No transcriptions stored.");
            } else {
                let translated: Vec<i64> = storage
                    .list_translations()?
                    .into_iter()
                    .map(|t| t.transcription_id)
                    .collect();

                println!("{:<6} {:<40} {:<20} {:<10}", "ID", "File", "Created", "Translated");
                println!("{}", "-".repeat(80));
                for t in transcriptions {
                    let status = if translated.contains(&t.id) { "yes" } else { "no" };
                    println!("{:<6} {:<40} {:<20} {:<10}", t.id, t.file_name, t.created_at, status);
                }
            }
        }
        Commands::Show { id, translation, output } => {
            let storage = open_storage(&config)?;
            match (translation, output) {
                (false, Some(path)) => save_transcription_to_file(&storage, id, &path).await?,
                (true, Some(path)) => save_translation_to_file(&storage, id, &path).await?,
                (false, None) => println!("{}", storage.get_text(id)?),
                (true, None) => println!("{}", storage.get_translation(id)?),
            }
        }
        Commands::Export { out } => {
            let storage = open_storage(&config)?;
            let written = export_translations(&storage, &out).await?;
            println!("Exported {} translations to {}", written.len(), out.display());
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::from_file(path)?),
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Ok(Config::from_file(DEFAULT_CONFIG_FILE)?)
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn open_storage(config: &Config) -> Result<SqliteStorage> {
    let path = &config.storage.database_path;
    SqliteStorage::open(path).with_context(|| format!("error opening database {}", path.display()))
}

async fn run_pipeline(config: &Config, storage: &SqliteStorage, id: i64) -> Result<PipelineReport> {
    if config.completion.api_key.is_empty() {
        warn!("{} is not set; requests are sent without authorization", API_KEY_ENV);
    }

    let completer: Arc<dyn Completer> = Arc::new(CompletionClient::from_config(&config.completion)?);
    let curator = TermCurator::new(
        Box::new(ConsolePrompter::stdio()),
        Box::new(CommandEditor::from_config(config.curation.editor.as_deref())),
    );

    let mut pipeline = TranslationPipeline::from_config(config, completer, curator, storage);
    let report = pipeline
        .process_transcription(id)
        .await
        .with_context(|| format!("error processing transcription {}", id))?;
    Ok(report)
}

fn print_report(report: &PipelineReport) {
    println!(
        "Transcription {} translated; {} of {} terms kept untranslated ({:?})",
        report.transcription_id,
        report.preserved_count(),
        report.terms.len(),
        report.outcome
    );
    println!();
    println!("{}", report.translation);
}

fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".termkeep").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "termkeep.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Flushes on drop; must outlive every log call
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("termkeep.log").display()
    );
    Ok(())
}
