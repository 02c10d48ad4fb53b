//! Reactive stores holding captured model state.
//!
//! Every backend keeps one plain `serde_json::Value` tree and exposes it
//! through the object-safe [`Store`] trait. The backends differ only in how a
//! path-addressed write lands in the tree:
//!
//! - [`ProxyStore`]: nested assignment into the existing tree, key by key;
//! - [`SignalStore`]: a path-addressed setter with per-path versions;
//! - [`WritableStore`]: a functional update producing a new root.
//!
//! # Invariants
//!
//! 1. The version increments exactly once per successful write.
//! 2. A failed write leaves state and version untouched.
//! 3. Subscribers are notified in registration order, after the internal
//!    borrow is released, so a callback may read the store again.
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    notification.

mod derived;
mod proxy;
mod signal;
mod subscribers;
mod writable;

pub use derived::{derive, Derived};
pub use proxy::ProxyStore;
pub use signal::SignalStore;
pub use subscribers::Subscription;
pub use writable::{produce, WritableStore};

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use model_state_path::{Path, PathError};
use serde_json::Value;

use crate::error::{ConfigError, StoreError};
use subscribers::Subscribers;

/// A reactive container of plain state.
pub trait Store {
    fn backend(&self) -> Backend;

    /// A deep copy of the whole state.
    fn snapshot(&self) -> Value;

    /// Borrowed view of the whole state.
    ///
    /// The borrow must be released before the store is written again.
    fn read(&self) -> Ref<'_, Value>;

    /// A copy of the value at `path`, if it exists.
    fn read_at(&self, path: &Path) -> Option<Value>;

    /// Replace the value at `path`.
    ///
    /// The parent of `path` must exist; writing one past the end of an array
    /// appends.
    fn write_at(&self, path: &Path, value: Value) -> Result<(), StoreError>;

    /// Number of successful writes so far.
    fn version(&self) -> u64;

    /// Call `callback` with the new state after every write.
    fn subscribe(&self, callback: Box<dyn Fn(&Value)>) -> Subscription;
}

/// The available store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Backend {
    Proxy,
    #[default]
    Signal,
    Writable,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Proxy, Backend::Signal, Backend::Writable];

    pub fn name(self) -> &'static str {
        match self {
            Backend::Proxy => "proxy",
            Backend::Signal => "signal",
            Backend::Writable => "writable",
        }
    }

    /// A new store of this backend holding `initial`.
    pub fn create(self, initial: Value) -> Rc<dyn Store> {
        match self {
            Backend::Proxy => Rc::new(ProxyStore::new(initial)),
            Backend::Signal => Rc::new(SignalStore::new(initial)),
            Backend::Writable => Rc::new(WritableStore::new(initial)),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Backend::ALL
            .into_iter()
            .find(|backend| backend.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::UnknownBackend(s.to_string()))
    }
}

// ── Shared state cell ─────────────────────────────────────────────────────

/// State, version counter and subscribers shared by every backend.
pub(crate) struct StateCell {
    state: RefCell<Value>,
    version: Cell<u64>,
    subscribers: Subscribers,
}

impl StateCell {
    pub(crate) fn new(initial: Value) -> Self {
        Self {
            state: RefCell::new(initial),
            version: Cell::new(0),
            subscribers: Subscribers::default(),
        }
    }

    pub(crate) fn read(&self) -> Ref<'_, Value> {
        self.state.borrow()
    }

    pub(crate) fn read_at(&self, path: &Path) -> Option<Value> {
        let value = model_state_path::get(&self.state.borrow(), path).cloned();
        tracing::trace!(path = %path, found = value.is_some(), "store read");
        value
    }

    pub(crate) fn version(&self) -> u64 {
        self.version.get()
    }

    pub(crate) fn subscribe(&self, callback: Box<dyn Fn(&Value)>) -> Subscription {
        self.subscribers.subscribe(callback)
    }

    /// Apply `write` to the state; on success bump the version and notify.
    pub(crate) fn commit<F>(&self, path: &Path, write: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Value) -> Result<(), PathError>,
    {
        {
            let mut state = self.state.borrow_mut();
            write(&mut state).map_err(|source| StoreError::Write {
                path: path.to_string(),
                source,
            })?;
        }
        self.version.set(self.version.get() + 1);
        if self.subscribers.has_live() {
            let state = self.state.borrow().clone();
            self.subscribers.notify(&state);
        }
        Ok(())
    }
}
