//! Projection configuration.

use std::env;

use crate::store::Backend;

/// Environment variable selecting the default store backend.
pub const BACKEND_ENV: &str = "MODEL_STATE_BACKEND";

/// Settings applied by [`use_model_with`](crate::use_model_with).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    pub backend: Backend,
}

impl Config {
    #[must_use]
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Configuration taken from the environment.
    ///
    /// Reads [`BACKEND_ENV`]; an unset or unknown value selects the default
    /// backend.
    #[must_use]
    pub fn from_env() -> Self {
        let backend = env::var(BACKEND_ENV).ok();
        Self {
            backend: backend_from(backend.as_deref()),
        }
    }
}

/// Backend named by `value`, falling back to the default.
pub fn backend_from(value: Option<&str>) -> Backend {
    let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
        return Backend::default();
    };
    value.parse().unwrap_or_else(|err| {
        tracing::warn!(%err, "falling back to the {} backend", Backend::default());
        Backend::default()
    })
}
