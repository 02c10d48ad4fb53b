//! model-state: live reactive-store projections of plain Rust model trees.
//!
//! A model tree is ordinary Rust data that describes itself through the
//! [`Model`] trait. [`use_model`] validates the tree, captures it into a
//! reactive [`Store`](store::Store) and returns a [`ModelState`] projection:
//! field reads come from the store, method calls mutate the live model and
//! write a fresh snapshot of the owning model back at its path.
//!
//! ```
//! use model_state::{use_model, Class, Field, Model};
//! use serde_json::{json, Value};
//!
//! struct Counter {
//!     count: i64,
//! }
//!
//! impl Model for Counter {
//!     fn class() -> Class<Self> {
//!         Class::<Self>::composite("Counter")
//!             .method("increment", |c, _| {
//!                 c.count += 1;
//!                 Ok(Value::Null)
//!             })
//!             .getter("double", |s| json!(s.i64("count").unwrap_or(0) * 2))
//!     }
//!
//!     fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
//!         vec![("count", Field::plain(&self.count))]
//!     }
//! }
//!
//! let state = use_model(Counter { count: 0 }).unwrap();
//! state.call("increment", &[]).unwrap();
//! assert_eq!(state.get("count"), Some(json!(1)));
//! assert_eq!(state.get("double"), Some(json!(2)));
//! ```

pub mod capture;
pub mod config;
pub mod error;
pub mod facade;
pub mod introspect;
pub mod model;
pub mod project;
pub mod resync;
pub mod store;

use std::rc::Rc;

use serde_json::Value;

pub use capture::{capture, Snapshot};
pub use config::Config;
pub use error::{ConfigError, ModelError, StoreError};
pub use introspect::{introspect, validate, Shape};
pub use model::{
    class_of, Args, ArrayModel, Class, Field, FieldKind, Getter, Getters, ItemFactory, ListModel,
    Model, ModelKind, PlainValue, PrimitiveModel, Reflect, LIST_FIELD, VALUE_FIELD,
};
pub use model_state_path::{Path, PathStep};
pub use project::{ItemMethodHandle, ItemMethods, MethodHandle, ModelState};
pub use resync::Resynchronizer;
pub use store::{Backend, Derived, Store, Subscription};

/// Project `model` into a store of the default backend.
///
/// # Errors
///
/// [`ModelError::InvalidModel`] if the tree is malformed,
/// [`ModelError::Snapshot`] if it cannot be captured.
pub fn use_model<M: Model>(model: M) -> Result<ModelState, ModelError> {
    use_model_with(model, &Config::default())
}

/// Project `model` into a store chosen by `config`.
pub fn use_model_with<M: Model>(model: M, config: &Config) -> Result<ModelState, ModelError> {
    let backend = config.backend;
    use_model_in(model, move |initial| backend.create(initial))
}

/// Project `model` into a store built by `create_store` from the initial
/// snapshot.
pub fn use_model_in<M, F>(model: M, create_store: F) -> Result<ModelState, ModelError>
where
    M: Model,
    F: FnOnce(Value) -> Rc<dyn Store>,
{
    project::build(Box::new(model), create_store)
}
