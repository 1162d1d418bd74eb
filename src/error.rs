use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Directory {} does not exist.", .0.display())]
    MissingDirectory(PathBuf),

    #[error("Archive file {} not found.", .0.display())]
    MissingArchiveFile(PathBuf),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tweet {id}: invalid {field} {value:?}")]
    InvalidField {
        id: String,
        field: &'static str,
        value: String,
    },
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("decision file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown decision category {0:?}")]
    UnknownCategory(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("credentials file is missing {0}")]
    MissingKey(&'static str),

    #[error("{key} must be a whole number, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error(transparent)]
    Dotenv(#[from] dotenv::Error),
}
