use thiserror::Error;

#[derive(Error, Debug)]
pub enum TermkeepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("request failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<TermkeepError>,
    },

    #[error("Curation I/O error: {0}")]
    CurationIo(String),

    #[error("invalid choice: {0}")]
    InvalidChoice(String),

    #[error("error translating chunk {position} of {total}: {source}")]
    ChunkFailed {
        position: usize,
        total: usize,
        #[source]
        source: Box<TermkeepError>,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<TermkeepError>,
    },
}

impl TermkeepError {
    /// Whether the completion client may issue another attempt after this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Api { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }

    /// Wrap the error with a short description of the step that failed.
    pub fn context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, looking through context and retry wrappers.
    pub fn root(&self) -> &TermkeepError {
        match self {
            Self::Context { source, .. }
            | Self::RetriesExhausted { source, .. }
            | Self::ChunkFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<rusqlite::Error> for TermkeepError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TermkeepError>;
