use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the remote document client.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Request failed: {0}")]
    Http(String),

    #[error("Remote returned status {status} for {path}")]
    Status { status: u16, path: String },

    #[error("Invalid document path: {0}")]
    InvalidPath(String),

    #[error("Automerge error: {0}")]
    Automerge(String),

    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<automerge::AutomergeError> for RemoteError {
    fn from(e: automerge::AutomergeError) -> Self {
        RemoteError::Automerge(e.to_string())
    }
}
