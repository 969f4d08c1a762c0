//! Error taxonomy shared by the client contract, the sidecar store and the
//! reconciliation engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single remote call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service answered, but the answer is an error payload.
    #[error("remote service rejected {operation}: {payload}")]
    Service {
        operation: &'static str,
        payload: serde_json::Value,
    },

    /// Network failure, or a response body that could not be decoded.
    #[error("transport failure during {operation}: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    /// The binary to upload does not exist locally.
    #[error("file to upload does not exist: {0}")]
    MissingFile(PathBuf),
}

impl ClientError {
    /// Service error payload, when the service produced one.
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            ClientError::Service { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CitationError {
    #[error("unknown citation template field: {{{0}}}")]
    UnknownField(String),

    #[error("unbalanced brace at byte {0} of citation template")]
    UnbalancedBrace(usize),

    #[error("failed to write citation {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure while reconciling one article. The batch driver logs these and
/// moves on to the next article.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("missing PDF artifact: {0}")]
    MissingArtifact(PathBuf),

    #[error(transparent)]
    Remote(#[from] ClientError),

    #[error("sidecar {path} is unreadable: {source}")]
    StateCorruption {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("sidecar i/o failed for {path}: {source}")]
    SidecarIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Citation(#[from] CitationError),
}

/// Failures that abort a whole batch before any article is touched.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("cannot prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
