use std::time::Duration;
use thiserror::Error;

/// Failure to query an entry store.
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Entry store did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Entry store unavailable: {0}")]
    Unavailable(String),

    #[error("Entry store error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Stored entry could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Entry store read task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl RetrievalError {
    /// Text shown to the person looking at a dashboard when analysis fails.
    pub fn user_message(&self) -> &'static str {
        match self {
            RetrievalError::Timeout(_) => "Analysis failed: the log store timed out, retry shortly",
            _ => "Analysis failed: check connectivity and retry",
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
