use std::cell::Ref;

use model_state_path::{Path, PathError};
use serde_json::Value;

use super::{Backend, StateCell, Store, Subscription};
use crate::error::StoreError;

/// Store written by nested assignment into the existing tree.
///
/// A write walks to the target and assigns into it key by key: objects are
/// merged recursively with stale keys removed, arrays and scalars are
/// replaced. Untouched parts of the target keep their identity and order.
pub struct ProxyStore {
    cell: StateCell,
}

impl ProxyStore {
    pub fn new(initial: Value) -> Self {
        Self {
            cell: StateCell::new(initial),
        }
    }
}

/// Assign `source` into `target` in place.
fn assign(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(to), Value::Object(from)) => {
            to.retain(|key, _| from.contains_key(key));
            for (key, value) in from {
                match to.get_mut(&key) {
                    Some(slot) => assign(slot, value),
                    None => {
                        to.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}

fn assign_at(state: &mut Value, path: &Path, value: Value) -> Result<(), PathError> {
    match model_state_path::get_mut(state, path) {
        Some(target) => {
            assign(target, value);
            Ok(())
        }
        None => model_state_path::replace(state, path, value).map(drop),
    }
}

impl Store for ProxyStore {
    fn backend(&self) -> Backend {
        Backend::Proxy
    }

    fn snapshot(&self) -> Value {
        self.cell.read().clone()
    }

    fn read(&self) -> Ref<'_, Value> {
        self.cell.read()
    }

    fn read_at(&self, path: &Path) -> Option<Value> {
        self.cell.read_at(path)
    }

    fn write_at(&self, path: &Path, value: Value) -> Result<(), StoreError> {
        self.cell.commit(path, |state| assign_at(state, path, value))
    }

    fn version(&self) -> u64 {
        self.cell.version()
    }

    fn subscribe(&self, callback: Box<dyn Fn(&Value)>) -> Subscription {
        self.cell.subscribe(callback)
    }
}
