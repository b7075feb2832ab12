use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Notion API error: {status} - {body}")]
    RemoteUnavailable { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Failed to write article {id}: {source}")]
    StorageWriteFailed {
        id: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// True for failures talking to the remote source, including transport errors.
    pub fn is_remote(&self) -> bool {
        matches!(self, AppError::RemoteUnavailable { .. } | AppError::Http(_))
    }

    pub fn storage_write(id: impl Into<String>, source: rusqlite::Error) -> Self {
        AppError::StorageWriteFailed {
            id: id.into(),
            source,
        }
    }
}
