use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_fs::prelude::*;
use assert_fs::TempDir;
use async_trait::async_trait;

use termkeep::completion::{CompletionClient, RetryPolicy, Transport, TransportReply};
use termkeep::config::Config;
use termkeep::error::{Result, TermkeepError};
use termkeep::storage::{SqliteStorage, Storage};
use termkeep::terms::{CurationOutcome, EditorLauncher, ScriptedPrompter, TermCurator};
use termkeep::workflow::{export_translations, import_transcript, TranslationPipeline};

/// Replays canned HTTP replies and records every request body
#[derive(Clone, Default)]
struct ReplayTransport {
    replies: Arc<Mutex<VecDeque<TransportReply>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ReplayTransport {
    fn reply(self, status: u16, content: &str) -> Self {
        let body = if status == 200 {
            serde_json::json!({
                "id": "gen-test",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
            })
            .to_string()
        } else {
            content.to_string()
        };
        self.replies.lock().unwrap().push_back(TransportReply { status, body });
        self
    }

    /// Prompt text of every request sent so far
    fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|body| {
                let value: serde_json::Value = serde_json::from_str(body).unwrap();
                value["messages"][0]["content"].as_str().unwrap().to_string()
            })
            .collect()
    }
}

#[async_trait]
impl Transport for ReplayTransport {
    async fn send(&self, body: String) -> Result<TransportReply> {
        self.requests.lock().unwrap().push(body);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TermkeepError::Transport("no reply left".to_string()))
    }
}

struct UnusedEditor;

impl EditorLauncher for UnusedEditor {
    fn edit(&self, path: &Path) -> Result<()> {
        panic!("editor should not be opened for {}", path.display());
    }
}

const ANALYSIS: &str = r#"Here you go:
```json
{"terms": [
  {"term": "ABS", "description": "anti-lock braking system", "category": "acronym"},
  {"term": "kPa", "description": "kilopascal", "category": "unit"}
]}
```"#;

fn transcript() -> String {
    (1..=7)
        .map(|i| format!("Paragraph {}: ABS keeps tyres at 220 kPa.", i))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn pipeline<'a>(
    transport: &ReplayTransport,
    storage: &'a SqliteStorage,
    answers: &[&str],
) -> TranslationPipeline<'static, &'a SqliteStorage> {
    let retry = RetryPolicy {
        max_attempts: 3,
        backoff_step: Duration::from_millis(1),
    };
    let client = CompletionClient::new(Box::new(transport.clone()), "test/model", retry);
    let curator = TermCurator::new(Box::new(ScriptedPrompter::new(answers.to_vec())), Box::new(UnusedEditor));

    let mut config = Config::default();
    config.translate.show_progress = false;
    TranslationPipeline::from_config(&config, Arc::new(client), curator, storage)
}

async fn imported(temp: &TempDir, storage: &SqliteStorage) -> i64 {
    let input = temp.child("lecture.txt");
    input.write_str(&transcript()).unwrap();
    import_transcript(storage, input.path()).await.unwrap()
}

#[tokio::test]
async fn test_import_curate_translate_and_export() {
    let temp = TempDir::new().unwrap();
    let storage = SqliteStorage::open(temp.child("db").child("transcriptions.db").path()).unwrap();
    let id = imported(&temp, &storage).await;

    let transport = ReplayTransport::default()
        .reply(503, "upstream overloaded")
        .reply(200, ANALYSIS)
        .reply(200, "  Первая часть: ABS.  ")
        .reply(200, "Вторая часть: ABS.");

    // walk terms: keep ABS, translate kPa
    let report = pipeline(&transport, &storage, &["3", "y", "n"])
        .process_transcription(id)
        .await
        .unwrap();

    assert_eq!(report.outcome, CurationOutcome::PerTermWalk);
    assert_eq!(report.translation, "Первая часть: ABS.\n\nВторая часть: ABS.");

    let prompts = transport.prompts();
    assert_eq!(prompts.len(), 4);
    assert_eq!(prompts[0], prompts[1]);
    for prompt in &prompts[2..] {
        assert!(prompt.contains("- ABS\n"));
        assert!(!prompt.contains("- kPa\n"));
    }
    assert!(prompts[2].contains("Paragraph 5:"));
    assert!(!prompts[2].contains("Paragraph 6:"));
    assert!(prompts[3].contains("Paragraph 7:"));

    let terms = storage.list_terms().unwrap();
    assert_eq!(terms.len(), 1);
    assert_eq!(terms[0].term, "ABS");
    assert_eq!(terms[0].description, "anti-lock braking system");
    assert_eq!(storage.get_translation(id).unwrap(), report.translation);

    let out = temp.child("translations");
    let written = export_translations(&storage, out.path()).await.unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(std::fs::read_to_string(&written[0]).unwrap(), report.translation);
}

#[tokio::test]
async fn test_failed_chunk_leaves_no_translation() {
    let temp = TempDir::new().unwrap();
    let storage = SqliteStorage::open_in_memory().unwrap();
    let id = imported(&temp, &storage).await;

    let transport = ReplayTransport::default()
        .reply(200, ANALYSIS)
        .reply(200, "Первая часть.")
        .reply(400, r#"{"error":"context length exceeded"}"#);

    let err = pipeline(&transport, &storage, &["1"])
        .process_transcription(id)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("error translating chunk 2 of 2"));
    assert!(matches!(err.root(), TermkeepError::Api { status: 400, .. }));
    assert_eq!(transport.prompts().len(), 3);

    // terms are written before translation starts
    assert_eq!(storage.list_terms().unwrap().len(), 2);
    assert!(storage.get_translation(id).is_err());
    assert!(storage.get_text(id).unwrap().starts_with("Paragraph 1:"));
}

#[tokio::test]
async fn test_server_errors_exhaust_retries_during_analysis() {
    let temp = TempDir::new().unwrap();
    let storage = SqliteStorage::open_in_memory().unwrap();
    let id = imported(&temp, &storage).await;

    let transport = ReplayTransport::default()
        .reply(502, "bad gateway")
        .reply(502, "bad gateway")
        .reply(502, "bad gateway");

    let err = pipeline(&transport, &storage, &[])
        .process_transcription(id)
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("error analyzing terms: request failed after 3 attempts"));
    assert_eq!(transport.prompts().len(), 3);
    assert!(storage.list_terms().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_completion_aborts_without_saving() {
    let temp = TempDir::new().unwrap();
    let storage = SqliteStorage::open_in_memory().unwrap();
    let id = imported(&temp, &storage).await;

    let transport = ReplayTransport::default()
        .reply(200, ANALYSIS)
        .reply(200, "Первая часть.")
        .reply(200, "");

    let err = pipeline(&transport, &storage, &["1"])
        .process_transcription(id)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("error translating chunk 2 of 2"));
    assert!(matches!(err.root(), TermkeepError::MalformedResponse(_)));
    assert_eq!(transport.prompts().len(), 3);
    assert!(storage.get_translation(id).is_err());
}
