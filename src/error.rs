use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config file {} is not valid JSON", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("object id {value:?} is not an integer")]
    MalformedRecord { value: String },

    #[error("column {index} is missing (line has {available} columns)")]
    MissingColumn { index: usize, available: usize },

    #[error("{value:?} is not a usable output file name")]
    InvalidFileName { value: String },

    #[error("file does not exist: {}", path.display())]
    SourceMissing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
