use thiserror::Error;

#[derive(Error, Debug)]
pub enum RevlensError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Unknown rule: {0}")]
    UnknownRule(String),

    #[error("Missing column mapping for required field(s): {0}. Map them and import again.")]
    MissingMapping(String),

    #[error("No header row found in {0}")]
    NoHeaders(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RevlensError>;
