use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Io { path: PathBuf, source: std::io::Error },
    Config { path: PathBuf, message: String },
    InvalidData(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "SQLite error: {e}"),
            StoreError::Io { path, source } => write!(f, "I/O error at {}: {source}", path.display()),
            StoreError::Config { path, message } => {
                write!(f, "invalid config {}: {message}", path.display())
            }
            StoreError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Sqlite(e) => Some(e),
            StoreError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
