//! Errors raised while constructing adapters.
//!
//! Once constructed, adapters never fail outward: invocation problems become
//! the tool's result string. These errors only surface at wiring time or
//! from the document retriever, whose failures the retrieval tool renders.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required environment variable is absent.
    #[error("{name} environment variable not set")]
    MissingEnv { name: String },

    #[error("http request failed: {reason}")]
    Http { reason: String },

    #[error("document corpus error: {reason}")]
    Corpus { reason: String },
}

pub type AdapterResult<T> = Result<T, AdapterError>;

impl From<reqwest::Error> for AdapterError {
    fn from(e: reqwest::Error) -> Self {
        AdapterError::Http {
            reason: e.to_string(),
        }
    }
}
