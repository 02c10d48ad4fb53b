//! Error types.

use model_state_path::PathError;
use thiserror::Error;

/// Errors raised while building a projection or running a projected method.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The instance handed to `use_model` does not form a valid model tree.
    #[error("invalid model `{model}`: {reason}")]
    InvalidModel { model: &'static str, reason: String },
    /// A plain copy of model state could not be produced.
    #[error("snapshot failed: {0}")]
    Snapshot(#[from] serde_json::Error),
    #[error("unknown method `{method}` on `{model}`")]
    UnknownMethod { model: String, method: String },
    #[error("missing argument {0}")]
    MissingArgument(usize),
    #[error("bad argument {index}: {source}")]
    BadArgument {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    /// A projection addressed a model that no longer sits at its path.
    #[error("no model at {0}")]
    PathNotFound(String),
    /// The live model is already being mutated by another projected call.
    #[error("model is busy")]
    Busy,
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Failure reported by a user-defined model method.
    #[error("{0}")]
    Method(String),
}

impl ModelError {
    /// Failure raised from inside a model method.
    pub fn method(message: impl Into<String>) -> Self {
        ModelError::Method(message.into())
    }

    pub(crate) fn invalid(model: &'static str, reason: impl Into<String>) -> Self {
        ModelError::InvalidModel {
            model,
            reason: reason.into(),
        }
    }
}

/// Errors raised by store backends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("write at {path} failed: {source}")]
    Write {
        path: String,
        #[source]
        source: PathError,
    },
}

/// Errors raised while reading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown store backend `{0}` (expected proxy, signal or writable)")]
    UnknownBackend(String),
}
