//! Writing fresh snapshots back into the store.

use std::rc::Rc;

use model_state_path::Path;
use serde_json::Value;

use crate::capture::capture;
use crate::error::ModelError;
use crate::model::Model;
use crate::store::Store;

/// Replaces store subtrees with fresh snapshots of their owning models.
///
/// Each write replaces exactly the subtree at the given path; siblings and
/// ancestors keep their stored values.
#[derive(Clone)]
pub struct Resynchronizer {
    store: Rc<dyn Store>,
}

impl Resynchronizer {
    pub fn new(store: Rc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Rc<dyn Store> {
        &self.store
    }

    /// Write a snapshot taken earlier at `path`.
    pub fn write(&self, path: &Path, snapshot: Value) -> Result<(), ModelError> {
        self.store.write_at(path, snapshot)?;
        tracing::debug!(
            path = %path,
            backend = %self.store.backend(),
            version = self.store.version(),
            "resynchronized"
        );
        Ok(())
    }

    /// Capture `model` and write it at `path`.
    ///
    /// Store subscribers run while `model` is still borrowed; when they may
    /// call back into projections, capture first and use
    /// [`Resynchronizer::write`] once the borrow is released.
    pub fn resync(&self, model: &dyn Model, path: &Path) -> Result<(), ModelError> {
        let snapshot = capture(model)?;
        self.write(path, snapshot)
    }
}

impl std::fmt::Debug for Resynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resynchronizer")
            .field("backend", &self.store.backend())
            .finish()
    }
}
