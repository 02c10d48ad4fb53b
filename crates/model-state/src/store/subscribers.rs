use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::Value;

type Callback = dyn Fn(&Value);

/// Registered callbacks, held weakly; the strong end lives in a
/// [`Subscription`].
#[derive(Default)]
pub(crate) struct Subscribers {
    entries: RefCell<Vec<Weak<Callback>>>,
}

impl Subscribers {
    pub(crate) fn subscribe(&self, callback: Box<Callback>) -> Subscription {
        let callback: Rc<Callback> = Rc::from(callback);
        self.entries.borrow_mut().push(Rc::downgrade(&callback));
        Subscription { _callback: callback }
    }

    pub(crate) fn has_live(&self) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|entry| entry.strong_count() > 0)
    }

    /// Call every live callback in registration order, dropping dead entries.
    pub(crate) fn notify(&self, state: &Value) {
        // Upgraded first so callbacks may subscribe or unsubscribe while running.
        let live: Vec<Rc<Callback>> = {
            let mut entries = self.entries.borrow_mut();
            entries.retain(|entry| entry.strong_count() > 0);
            entries.iter().filter_map(Weak::upgrade).collect()
        };
        for callback in live {
            callback(state);
        }
    }
}

/// RAII guard for a store subscription; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    _callback: Rc<Callback>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn test_notify_in_registration_order() {
        let subscribers = Subscribers::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = {
            let log = Rc::clone(&log);
            subscribers.subscribe(Box::new(move |_| log.borrow_mut().push("a")))
        };
        let b = {
            let log = Rc::clone(&log);
            subscribers.subscribe(Box::new(move |_| log.borrow_mut().push("b")))
        };
        subscribers.notify(&json!(1));
        assert_eq!(*log.borrow(), ["a", "b"]);
        drop((a, b));
    }

    #[test]
    fn test_drop_unsubscribes() {
        let subscribers = Subscribers::default();
        let hits = Rc::new(Cell::new(0));
        let sub = {
            let hits = Rc::clone(&hits);
            subscribers.subscribe(Box::new(move |_| hits.set(hits.get() + 1)))
        };
        subscribers.notify(&json!(null));
        drop(sub);
        assert!(!subscribers.has_live());
        subscribers.notify(&json!(null));
        assert_eq!(hits.get(), 1);
    }
}
