use std::cell::Ref;
use std::cmp::Ordering;

use model_state_path::{Path, PathError, PathStep};
use serde_json::Value;

use super::{Backend, StateCell, Store, Subscription};
use crate::error::StoreError;

/// Store updated functionally: every write produces a new root.
pub struct WritableStore {
    cell: StateCell,
}

impl WritableStore {
    pub fn new(initial: Value) -> Self {
        Self {
            cell: StateCell::new(initial),
        }
    }

    /// Replace the whole state.
    pub fn set(&self, value: Value) {
        // A root write cannot fail.
        let _ = self.cell.commit(&Path::root(), |state| {
            *state = value;
            Ok(())
        });
    }

    /// Replace the whole state with `f(current)`.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&Value) -> Value,
    {
        let next = f(&self.cell.read());
        self.set(next);
    }
}

/// A new tree equal to `root` with the value at `path` replaced.
///
/// The tree is rebuilt bottom-up along `path`; `root` itself is untouched.
///
/// # Errors
///
/// Same as [`model_state_path::replace`].
pub fn produce(root: &Value, path: &Path, value: Value) -> Result<Value, PathError> {
    produce_steps(root, path.steps(), value)
}

fn produce_steps(node: &Value, steps: &[PathStep], value: Value) -> Result<Value, PathError> {
    let Some((step, rest)) = steps.split_first() else {
        return Ok(value);
    };
    match node {
        Value::Object(map) => {
            let key = step.to_key();
            let child = match map.get(&key) {
                Some(child) => produce_steps(child, rest, value)?,
                None if rest.is_empty() => value,
                None => return Err(PathError::NotFound),
            };
            let mut next = map.clone();
            next.insert(key, child);
            Ok(Value::Object(next))
        }
        Value::Array(items) => {
            if !rest.is_empty() {
                let index = step
                    .as_index()
                    .filter(|&index| index < items.len())
                    .ok_or(PathError::NotFound)?;
                let child = produce_steps(&items[index], rest, value)?;
                let mut next = items.clone();
                next[index] = child;
                return Ok(Value::Array(next));
            }
            let index = if step.as_key() == Some("-") {
                items.len()
            } else {
                step.as_index().ok_or(PathError::InvalidIndex)?
            };
            let mut next = items.clone();
            match index.cmp(&items.len()) {
                Ordering::Less => next[index] = value,
                Ordering::Equal => next.push(value),
                Ordering::Greater => return Err(PathError::InvalidIndex),
            }
            Ok(Value::Array(next))
        }
        _ if rest.is_empty() => Err(PathError::NotAContainer),
        _ => Err(PathError::NotFound),
    }
}

impl Store for WritableStore {
    fn backend(&self) -> Backend {
        Backend::Writable
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
        self.cell.commit(path, |state| {
            *state = produce(state, path, value)?;
            Ok(())
        })
    }

    fn version(&self) -> u64 {
        self.cell.version()
    }

    fn subscribe(&self, callback: Box<dyn Fn(&Value)>) -> Subscription {
        self.cell.subscribe(callback)
    }
}
