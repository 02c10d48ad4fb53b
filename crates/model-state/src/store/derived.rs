use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use super::{Store, Subscription};

type Projection<T> = Rc<dyn Fn(&Value) -> T>;

/// A read-only view computed from a store's state.
///
/// The projection runs lazily and is memoized against the store version, so
/// repeated reads between writes never recompute.
pub struct Derived<T> {
    source: Rc<dyn Store>,
    project: Projection<T>,
    cache: RefCell<Option<(u64, T)>>,
}

impl<T: Clone + 'static> Derived<T> {
    pub fn new<F>(source: Rc<dyn Store>, project: F) -> Self
    where
        F: Fn(&Value) -> T + 'static,
    {
        Self {
            source,
            project: Rc::new(project),
            cache: RefCell::new(None),
        }
    }

    /// The current value, recomputed only if the store changed.
    pub fn get(&self) -> T {
        let version = self.source.version();
        if let Some((cached, value)) = &*self.cache.borrow() {
            if *cached == version {
                return value.clone();
            }
        }
        let value = (self.project)(&self.source.read());
        *self.cache.borrow_mut() = Some((version, value.clone()));
        value
    }

    /// Whether the next [`Derived::get`] will recompute.
    pub fn is_stale(&self) -> bool {
        match &*self.cache.borrow() {
            Some((cached, _)) => *cached != self.source.version(),
            None => true,
        }
    }

    /// Call `callback` with the projected value after every store write.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let project = Rc::clone(&self.project);
        self.source
            .subscribe(Box::new(move |state| callback(&project(state))))
    }
}

impl<T> std::fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Derived")
            .field("backend", &self.source.backend())
            .field("version", &self.source.version())
            .finish_non_exhaustive()
    }
}

/// Shorthand for [`Derived::new`].
pub fn derive<T, F>(source: Rc<dyn Store>, project: F) -> Derived<T>
where
    T: Clone + 'static,
    F: Fn(&Value) -> T + 'static,
{
    Derived::new(source, project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Backend;
    use model_state_path::parse_pointer;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn test_memoized_until_write() {
        let store = Backend::Signal.create(json!({"n": 1}));
        let runs = Rc::new(Cell::new(0));
        let double = {
            let runs = Rc::clone(&runs);
            derive(Rc::clone(&store), move |state| {
                runs.set(runs.get() + 1);
                state["n"].as_i64().unwrap_or(0) * 2
            })
        };
        assert!(double.is_stale());
        assert_eq!(double.get(), 2);
        assert_eq!(double.get(), 2);
        assert_eq!(runs.get(), 1);

        store.write_at(&parse_pointer("/n"), json!(5)).unwrap();
        assert!(double.is_stale());
        assert_eq!(double.get(), 10);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_subscribe_receives_projection() {
        let store = Backend::Writable.create(json!({"n": 1}));
        let double = derive(Rc::clone(&store), |state| state["n"].as_i64().unwrap_or(0) * 2);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _sub = {
            let seen = Rc::clone(&seen);
            double.subscribe(move |value| seen.borrow_mut().push(*value))
        };
        store.write_at(&parse_pointer("/n"), json!(3)).unwrap();
        store.write_at(&parse_pointer("/n"), json!(4)).unwrap();
        assert_eq!(*seen.borrow(), [6, 8]);
    }
}
