use std::cell::{Ref, RefCell};
use std::collections::HashMap;

use model_state_path::Path;
use serde_json::Value;

use super::{Backend, StateCell, Store, Subscription};
use crate::error::StoreError;

/// Store written through a path-addressed setter, with fine-grained versions.
///
/// Besides the global version, every path has its own version that changes
/// only when a write lands on the path itself, on one of its ancestors or on
/// one of its descendants. Readers of a sibling subtree see no change.
///
/// Path versions are stamps: the global version of the last write that
/// touched the path. A write drops the entries of every path below it, since
/// the stamp at the written path now dominates them. Entries of removed list
/// items therefore go away with the write that removed them.
pub struct SignalStore {
    cell: StateCell,
    /// Stamp of the last write at or below each pointer.
    below: RefCell<HashMap<String, u64>>,
    /// Stamp of the last write exactly at each pointer.
    exact: RefCell<HashMap<String, u64>>,
}

impl SignalStore {
    pub fn new(initial: Value) -> Self {
        Self {
            cell: StateCell::new(initial),
            below: RefCell::new(HashMap::new()),
            exact: RefCell::new(HashMap::new()),
        }
    }

    /// Replace the value at `path`.
    pub fn set_state(&self, path: &Path, value: Value) -> Result<(), StoreError> {
        let stamp = self.cell.version() + 1;
        self.cell.commit(path, |state| {
            model_state_path::replace(state, path, value)?;
            self.record(path, stamp);
            Ok(())
        })
    }

    fn record(&self, path: &Path, stamp: u64) {
        let pointer = path.to_pointer();
        let nested = format!("{pointer}/");
        let mut below = self.below.borrow_mut();
        below.retain(|key, _| !key.starts_with(&nested));
        for prefix in prefixes(path) {
            below.insert(prefix, stamp);
        }
        let mut exact = self.exact.borrow_mut();
        exact.retain(|key, _| !key.starts_with(&nested));
        exact.insert(pointer, stamp);
    }

    /// Global version of the last write that touched the subtree at `path`;
    /// zero if none did.
    pub fn version_at(&self, path: &Path) -> u64 {
        let pointer = path.to_pointer();
        let below = self.below.borrow().get(&pointer).copied().unwrap_or(0);
        let exact = self.exact.borrow();
        prefixes(path)
            .filter(|prefix| *prefix != pointer)
            .filter_map(|prefix| exact.get(&prefix).copied())
            .fold(below, u64::max)
    }
}

/// Pointers of the root, every ancestor of `path` and `path` itself.
///
/// Keyed by pointer so `Key("1")` and `Index(1)` count as the same step.
fn prefixes(path: &Path) -> impl Iterator<Item = String> + '_ {
    let mut pointer = String::new();
    std::iter::once(String::new()).chain(path.iter().map(move |step| {
        pointer.push('/');
        pointer.push_str(&step.to_string());
        pointer.clone()
    }))
}

impl Store for SignalStore {
    fn backend(&self) -> Backend {
        Backend::Signal
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
        self.set_state(path, value)
    }

    fn version(&self) -> u64 {
        self.cell.version()
    }

    fn subscribe(&self, callback: Box<dyn Fn(&Value)>) -> Subscription {
        self.cell.subscribe(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_state_path::parse_pointer;
    use serde_json::json;

    fn store() -> SignalStore {
        SignalStore::new(json!({
            "a": {"x": 1, "y": {"z": 2}},
            "b": {"x": 3}
        }))
    }

    #[test]
    fn test_versions_follow_written_subtree() {
        let store = store();
        store.set_state(&parse_pointer("/a/y"), json!({"z": 5})).unwrap();

        assert_eq!(store.version_at(&Path::root()), 1);
        assert_eq!(store.version_at(&parse_pointer("/a")), 1);
        assert_eq!(store.version_at(&parse_pointer("/a/y")), 1);
        assert_eq!(store.version_at(&parse_pointer("/a/y/z")), 1);
        assert_eq!(store.version_at(&parse_pointer("/a/x")), 0);
        assert_eq!(store.version_at(&parse_pointer("/b")), 0);
    }

    #[test]
    fn test_root_write_touches_every_path() {
        let store = store();
        store.set_state(&Path::root(), json!({})).unwrap();
        assert_eq!(store.version_at(&parse_pointer("/b/x")), 1);
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn test_failed_write_records_nothing() {
        let store = store();
        assert!(store.set_state(&parse_pointer("/c/d"), json!(1)).is_err());
        assert_eq!(store.version_at(&Path::root()), 0);
    }

    #[test]
    fn test_index_and_key_steps_share_versions() {
        let store = SignalStore::new(json!({"list": [{"n": 1}]}));
        store
            .set_state(&Path::root().child("list").child(0usize), json!({"n": 2}))
            .unwrap();
        assert_eq!(store.version_at(&parse_pointer("/list/0/n")), 1);
    }

    #[test]
    fn test_shrinking_write_drops_nested_entries() {
        let store = SignalStore::new(json!({"list": [1, 2, 3, 4], "other": 0}));
        for index in 0..4usize {
            store
                .set_state(&Path::root().child("list").child(index), json!(0))
                .unwrap();
        }
        store.set_state(&parse_pointer("/other"), json!(1)).unwrap();
        let before = store.version_at(&parse_pointer("/list/3"));
        assert_eq!(before, 4);

        store.set_state(&parse_pointer("/list"), json!([])).unwrap();
        let tracked = |map: &RefCell<HashMap<String, u64>>| {
            map.borrow().keys().filter(|key| key.starts_with("/list/")).count()
        };
        assert_eq!(tracked(&store.below), 0);
        assert_eq!(tracked(&store.exact), 0);
        assert_eq!(store.version_at(&parse_pointer("/list/3")), 6);
        assert_eq!(store.version_at(&parse_pointer("/other")), 5);
    }

    #[test]
    fn test_array_append_through_setter() {
        let store = SignalStore::new(json!({"list": [1]}));
        store.write_at(&parse_pointer("/list/1"), json!(2)).unwrap();
        assert_eq!(store.snapshot(), json!({"list": [1, 2]}));
    }
}
