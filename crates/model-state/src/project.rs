//! Live projections of a model tree.
//!
//! A [`ModelState`] mirrors one model level. Field reads go to the store,
//! lazily, at the path of the field. Method calls go to the live model: the
//! method runs, the owning model is captured again and its snapshot replaces
//! the subtree at the model's path. Array models additionally carry an
//! [`ItemMethods`] table that calls item methods by index and resynchronizes
//! only the touched item.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use model_state_path::{Path, PathStep};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::capture::{capture, Snapshot};
use crate::error::ModelError;
use crate::introspect::{introspect, validate};
use crate::model::{Args, Field, Getters, Model, ModelKind, LIST_FIELD, VALUE_FIELD};
use crate::resync::Resynchronizer;
use crate::store::{Store, Subscription};

// ── Shared context ────────────────────────────────────────────────────────

/// The live model tree and the store it is mirrored into.
pub(crate) struct Context {
    live: RefCell<Box<dyn Model>>,
    resync: Resynchronizer,
}

impl Context {
    pub(crate) fn store(&self) -> &Rc<dyn Store> {
        self.resync.store()
    }

    /// Run `f` on the live model at `path`.
    fn with_model<R>(
        &self,
        path: &Path,
        f: impl FnOnce(&mut dyn Model) -> Result<R, ModelError>,
    ) -> Result<R, ModelError> {
        let mut live = self.live.try_borrow_mut().map_err(|_| ModelError::Busy)?;
        let model = locate_mut(&mut **live, path)
            .ok_or_else(|| ModelError::PathNotFound(path.to_string()))?;
        f(model)
    }

    fn call_method(&self, path: &Path, method: &str, args: &[Value]) -> Result<Value, ModelError> {
        let _span = tracing::debug_span!("model_method", path = %path, method).entered();
        let (ret, snapshot) = self.with_model(path, |model| {
            let ret = model.invoke(method, &Args::new(args))?;
            Ok((ret, capture(model)?))
        })?;
        // The live borrow is released here, so store subscribers may call in.
        self.resync.write(path, snapshot)?;
        Ok(ret)
    }

    fn call_item(
        &self,
        array: &Path,
        method: &str,
        index: usize,
        args: &[Value],
    ) -> Result<Option<Value>, ModelError> {
        let _span = tracing::debug_span!("item_method", path = %array, method, index).entered();
        let outcome = self.with_model(array, |model| {
            let list = model
                .list_mut()
                .ok_or_else(|| ModelError::PathNotFound(array.to_string()))?;
            let Some(item) = list.item_mut(index) else {
                return Ok(None);
            };
            let ret = item.invoke(method, &Args::new(args))?;
            Ok(Some((ret, capture(item)?)))
        })?;
        match outcome {
            Some((ret, snapshot)) => {
                self.resync
                    .write(&array.child(LIST_FIELD).child(index), snapshot)?;
                Ok(Some(ret))
            }
            None => {
                tracing::debug!(index, "item index out of range, nothing to do");
                Ok(None)
            }
        }
    }
}

fn locate_mut<'m>(root: &'m mut dyn Model, path: &Path) -> Option<&'m mut dyn Model> {
    let mut node = root;
    let mut steps = path.iter();
    while let Some(step) = steps.next() {
        node = match step {
            PathStep::Key(key) if key == LIST_FIELD && node.list().is_some() => {
                let index = steps.next()?.as_index()?;
                node.list_mut()?.item_mut(index)?
            }
            PathStep::Key(key) => node.child_mut(key)?,
            PathStep::Index(_) => return None,
        };
    }
    Some(node)
}

fn locate<'m>(root: &'m dyn Model, path: &Path) -> Option<&'m dyn Model> {
    let mut node = root;
    let mut steps = path.iter();
    while let Some(step) = steps.next() {
        node = match step {
            PathStep::Key(key) if key == LIST_FIELD && node.list().is_some() => {
                let index = steps.next()?.as_index()?;
                node.list()?.item(index)?
            }
            PathStep::Key(key) => node.fields().into_iter().find_map(|(name, field)| match field {
                Field::Model(child) if name == key.as_str() => Some(child),
                _ => None,
            })?,
            PathStep::Index(_) => return None,
        };
    }
    Some(node)
}

// ── Projection nodes ──────────────────────────────────────────────────────

#[derive(Clone)]
pub(crate) enum Slot {
    /// A nested model, projected recursively.
    Model(ModelState),
    /// A stored field read lazily from the store.
    Field,
    /// A computed getter evaluated against the stored snapshot.
    Getter,
}

/// Live projection of one model level.
#[derive(Clone)]
pub struct ModelState {
    pub(crate) ctx: Rc<Context>,
    pub(crate) path: Path,
    pub(crate) type_name: &'static str,
    pub(crate) kind: ModelKind,
    pub(crate) slots: IndexMap<&'static str, Slot>,
    pub(crate) getters: Rc<Getters>,
    methods: Vec<&'static str>,
    items: Option<ItemMethods>,
}

impl ModelState {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Path of this model in the store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data fields in declaration order, then getters.
    pub fn field_names(&self) -> Vec<&'static str> {
        self.slots.keys().copied().collect()
    }

    /// Current value of field `name`, read from the store.
    ///
    /// Getters are evaluated against the stored snapshot of this model. A
    /// nested model reads as its stored subtree. `None` if this model has no
    /// such field.
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.slots.get(name)? {
            Slot::Getter => Some(self.evaluate(name)),
            Slot::Model(_) | Slot::Field => Some(
                self.ctx
                    .store()
                    .read_at(&self.path.child(name))
                    .unwrap_or(Value::Null),
            ),
        }
    }

    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|value| serde_json::from_value(value).ok())
    }

    fn evaluate(&self, name: &str) -> Value {
        let state = self.ctx.store().read();
        let data = model_state_path::get(&state, &self.path).unwrap_or(&Value::Null);
        tracing::trace!(path = %self.path, getter = name, "evaluating getter");
        Snapshot::new(data, &self.getters)
            .get(name)
            .unwrap_or(Value::Null)
    }

    /// Projection of the nested model in field `name`.
    pub fn model(&self, name: &str) -> Option<&ModelState> {
        match self.slots.get(name)? {
            Slot::Model(child) => Some(child),
            Slot::Field | Slot::Getter => None,
        }
    }

    /// The wrapped value of a primitive model.
    pub fn value(&self) -> Option<Value> {
        match self.kind {
            ModelKind::Primitive => self.get(VALUE_FIELD),
            ModelKind::Composite | ModelKind::Array => None,
        }
    }

    pub fn value_as<T: DeserializeOwned>(&self) -> Option<T> {
        self.value().and_then(|value| serde_json::from_value(value).ok())
    }

    fn with_list<R>(&self, f: impl FnOnce(&[Value]) -> R) -> Option<R> {
        if self.kind != ModelKind::Array {
            return None;
        }
        let state = self.ctx.store().read();
        let list = model_state_path::get(&state, &self.path.child(LIST_FIELD))?.as_array()?;
        Some(f(list))
    }

    /// Stored items of an array model.
    pub fn list(&self) -> Option<Vec<Value>> {
        self.with_list(<[Value]>::to_vec)
    }

    /// Stored item `index` of an array model.
    pub fn item(&self, index: usize) -> Option<Value> {
        self.with_list(|list| list.get(index).cloned()).flatten()
    }

    /// Number of stored items; zero for models that are not arrays.
    pub fn len(&self) -> usize {
        self.with_list(<[Value]>::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The index-addressed item method table of an array model.
    pub fn items(&self) -> Option<&ItemMethods> {
        self.items.as_ref()
    }

    /// Mutating method names, most-derived first.
    pub fn methods(&self) -> &[&'static str] {
        &self.methods
    }

    pub fn method(&self, name: &str) -> Option<MethodHandle> {
        let name = *self.methods.iter().find(|m| **m == name)?;
        Some(MethodHandle {
            ctx: Rc::clone(&self.ctx),
            path: self.path.clone(),
            name,
        })
    }

    /// Run method `name` on the live model, then resynchronize this model's
    /// subtree.
    ///
    /// # Errors
    ///
    /// [`ModelError::UnknownMethod`] for a name this model does not have,
    /// [`ModelError::Busy`] when called from inside another projected call,
    /// or whatever the method returns. A failing method leaves the store
    /// untouched.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, ModelError> {
        match self.method(name) {
            Some(handle) => handle.call(args),
            None => Err(ModelError::UnknownMethod {
                model: self.type_name.to_string(),
                method: name.to_string(),
            }),
        }
    }

    pub fn store(&self) -> Rc<dyn Store> {
        Rc::clone(self.ctx.store())
    }

    /// Stored subtree of this model.
    pub fn snapshot(&self) -> Value {
        self.ctx.store().read_at(&self.path).unwrap_or(Value::Null)
    }

    /// Stored subtree with every getter of this level attached.
    pub fn resolved(&self) -> Value {
        let snapshot = self.snapshot();
        Snapshot::new(&snapshot, &self.getters).resolve()
    }

    /// Call `callback` with this model's stored subtree after every write.
    pub fn subscribe(&self, callback: impl Fn(&Value) + 'static) -> Subscription {
        let path = self.path.clone();
        self.ctx.store().subscribe(Box::new(move |state| {
            if let Some(subtree) = model_state_path::get(state, &path) {
                callback(subtree);
            }
        }))
    }

    /// Read-only access to the live model behind this projection.
    ///
    /// # Errors
    ///
    /// [`ModelError::Busy`] while a projected call is running.
    pub fn inspect<R>(&self, f: impl FnOnce(&dyn Model) -> R) -> Result<R, ModelError> {
        let live = self.ctx.live.try_borrow().map_err(|_| ModelError::Busy)?;
        let model = locate(&**live, &self.path)
            .ok_or_else(|| ModelError::PathNotFound(self.path.to_string()))?;
        Ok(f(model))
    }
}

impl std::fmt::Debug for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelState")
            .field("type_name", &self.type_name)
            .field("path", &self.path.to_string())
            .field("kind", &self.kind)
            .field("fields", &self.field_names())
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

/// A callable bound to one method of one projected model.
#[derive(Clone)]
pub struct MethodHandle {
    ctx: Rc<Context>,
    path: Path,
    name: &'static str,
}

impl MethodHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, ModelError> {
        self.ctx.call_method(&self.path, self.name, args)
    }
}

impl std::fmt::Debug for MethodHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MethodHandle({} {})", self.path, self.name)
    }
}

/// Item methods of an array model, addressed by index.
#[derive(Clone)]
pub struct ItemMethods {
    ctx: Rc<Context>,
    /// Path of the array model; items live under `list`.
    path: Path,
    owner: &'static str,
    names: Rc<[&'static str]>,
}

impl ItemMethods {
    /// Method names of the item type, frozen when the array was created.
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    /// Run method `name` on item `index`, then resynchronize that item.
    ///
    /// An index with no item is a silent no-op returning `Ok(None)`.
    pub fn call(&self, name: &str, index: usize, args: &[Value]) -> Result<Option<Value>, ModelError> {
        match self.handle(name) {
            Some(handle) => handle.call(index, args),
            None => Err(ModelError::UnknownMethod {
                model: format!("{} item", self.owner),
                method: name.to_string(),
            }),
        }
    }

    pub fn handle(&self, name: &str) -> Option<ItemMethodHandle> {
        let name = *self.names.iter().find(|m| **m == name)?;
        Some(ItemMethodHandle {
            items: self.clone(),
            name,
        })
    }
}

impl std::fmt::Debug for ItemMethods {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemMethods")
            .field("path", &self.path.to_string())
            .field("names", &self.names)
            .finish()
    }
}

/// A callable bound to one item method; the index is chosen per call.
#[derive(Clone, Debug)]
pub struct ItemMethodHandle {
    items: ItemMethods,
    name: &'static str,
}

impl ItemMethodHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn call(&self, index: usize, args: &[Value]) -> Result<Option<Value>, ModelError> {
        self.items
            .ctx
            .call_item(&self.items.path, self.name, index, args)
    }
}

// ── Construction ──────────────────────────────────────────────────────────

/// Validate `model`, capture it into a store made by `create_store` and
/// project it.
pub(crate) fn build<F>(mut model: Box<dyn Model>, create_store: F) -> Result<ModelState, ModelError>
where
    F: FnOnce(Value) -> Rc<dyn Store>,
{
    validate(&mut *model)?;
    let initial = capture(&*model)?;
    let store = create_store(initial);
    tracing::debug!(
        model = model.type_name(),
        backend = %store.backend(),
        "projecting model"
    );
    let ctx = Rc::new(Context {
        live: RefCell::new(model),
        resync: Resynchronizer::new(store),
    });
    let live = ctx.live.borrow();
    let state = project(&ctx, &**live, Path::root());
    drop(live);
    Ok(state)
}

fn project(ctx: &Rc<Context>, model: &dyn Model, path: Path) -> ModelState {
    let shape = introspect(model);
    let mut slots = IndexMap::new();
    for (name, field) in model.fields() {
        let slot = match field {
            Field::Model(child) => Slot::Model(project(ctx, child, path.child(name))),
            Field::List(_) | Field::Plain(_) => Slot::Field,
        };
        slots.insert(name, slot);
    }
    for name in shape.getters.keys() {
        slots.insert(*name, Slot::Getter);
    }
    let items = model.list().map(|list| ItemMethods {
        ctx: Rc::clone(ctx),
        path: path.clone(),
        owner: shape.type_name,
        names: list.model_methods().into(),
    });
    ModelState {
        ctx: Rc::clone(ctx),
        path,
        type_name: shape.type_name,
        kind: shape.kind,
        slots,
        getters: Rc::new(shape.getters),
        methods: shape.methods,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Backend;
    use crate::{ArrayModel, Class, PrimitiveModel};
    use serde_json::json;

    struct Todo {
        title: String,
        done: bool,
    }

    impl Model for Todo {
        fn class() -> Class<Self> {
            Class::<Self>::composite("Todo").method("toggle", |todo, _| {
                todo.done = !todo.done;
                Ok(Value::Null)
            })
        }

        fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
            vec![("title", Field::plain(&self.title)), ("done", Field::plain(&self.done))]
        }
    }

    struct Board {
        todos: ArrayModel<Todo>,
        owner: PrimitiveModel<String>,
    }

    impl Model for Board {
        fn class() -> Class<Self> {
            Class::<Self>::composite("Board")
                .method("add", |board, args| {
                    board.todos.push(Todo {
                        title: args.arg(0)?,
                        done: false,
                    });
                    Ok(json!(board.todos.len()))
                })
                .method("rename", |board, args| {
                    board.owner.set(args.arg(0)?);
                    Ok(Value::Null)
                })
                .getter("open", |s| {
                    let open = s
                        .field("todos")
                        .and_then(|t| t.get(LIST_FIELD))
                        .and_then(Value::as_array)
                        .map_or(0, |list| list.iter().filter(|t| t["done"] == json!(false)).count());
                    json!(open)
                })
        }

        fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
            vec![("todos", Field::model(&self.todos)), ("owner", Field::model(&self.owner))]
        }

        fn child_mut(&mut self, name: &str) -> Option<&mut dyn Model> {
            match name {
                "todos" => Some(&mut self.todos),
                "owner" => Some(&mut self.owner),
                _ => None,
            }
        }
    }

    fn board() -> ModelState {
        let board = Board {
            todos: ArrayModel::with_factory(|args| {
                Ok(Todo {
                    title: args.arg(0)?,
                    done: false,
                })
            }),
            owner: "ada".to_string().into(),
        };
        build(Box::new(board), |initial| Backend::Signal.create(initial)).unwrap()
    }

    #[test]
    fn test_fields_then_getters() {
        let state = board();
        assert_eq!(state.field_names(), ["todos", "owner", "open"]);
        assert_eq!(state.methods(), ["add", "rename"]);
        assert_eq!(state.model("owner").unwrap().value(), Some(json!("ada")));
        assert_eq!(state.get("missing"), None);
    }

    #[test]
    fn test_method_resyncs_owner_subtree() {
        let state = board();
        assert_eq!(state.call("add", &[json!("milk")]).unwrap(), json!(1));
        let todos = state.model("todos").unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos.item(0), Some(json!({"title": "milk", "done": false})));
        assert_eq!(state.get("open"), Some(json!(1)));
    }

    #[test]
    fn test_item_method_touches_one_item() {
        let state = board();
        state.call("add", &[json!("a")]).unwrap();
        state.call("add", &[json!("b")]).unwrap();
        let items = state.model("todos").unwrap().items().unwrap();
        assert_eq!(items.names(), ["toggle"]);
        assert_eq!(items.call("toggle", 1, &[]).unwrap(), Some(Value::Null));
        assert_eq!(
            state.snapshot()["todos"]["list"],
            json!([{"title": "a", "done": false}, {"title": "b", "done": true}])
        );
        assert_eq!(state.get("open"), Some(json!(1)));
    }

    #[test]
    fn test_nested_array_projects_container_methods() {
        let state = board();
        let todos = state.model("todos").unwrap();
        assert_eq!(todos.methods(), ["at", "push", "pop"]);

        assert_eq!(todos.call("push", &[json!("a")]).unwrap(), json!(1));
        todos.call("push", &[json!("b")]).unwrap();
        todos.call("push", &[json!("c")]).unwrap();
        assert_eq!(todos.call("at", &[json!(-1)]).unwrap(), json!({"title": "c", "done": false}));

        assert_eq!(todos.call("pop", &[]).unwrap(), json!({"title": "c", "done": false}));
        todos.call("pop", &[json!(0)]).unwrap();
        assert_eq!(todos.list(), Some(vec![json!({"title": "b", "done": false})]));
        assert_eq!(state.get("open"), Some(json!(1)));
    }

    #[test]
    fn test_item_out_of_range_is_noop() {
        let state = board();
        let version = state.store().version();
        let items = state.model("todos").unwrap().items().unwrap();
        assert_eq!(items.call("toggle", 3, &[]).unwrap(), None);
        assert_eq!(state.store().version(), version);
    }

    #[test]
    fn test_unknown_and_failing_methods_leave_store() {
        let state = board();
        assert!(matches!(state.call("nope", &[]), Err(ModelError::UnknownMethod { .. })));
        assert!(matches!(state.call("add", &[]), Err(ModelError::MissingArgument(0))));
        assert_eq!(state.store().version(), 0);
        let items = state.model("todos").unwrap().items().unwrap();
        assert!(matches!(items.call("nope", 0, &[]), Err(ModelError::UnknownMethod { .. })));
    }

    #[test]
    fn test_call_inside_inspect_is_busy() {
        let state = board();
        let result = state
            .inspect(|_| state.call("rename", &[json!("bob")]))
            .unwrap();
        assert!(matches!(result, Err(ModelError::Busy)));
        assert_eq!(state.model("owner").unwrap().value(), Some(json!("ada")));
    }

    #[test]
    fn test_subscribers_may_read_back() {
        let state = board();
        let inner = state.clone();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _sub = {
            let seen = Rc::clone(&seen);
            state.subscribe(move |_| {
                let live = inner.inspect(|m| m.type_name()).ok();
                seen.borrow_mut().push((live, inner.get("open")));
            })
        };
        state.call("add", &[json!("a")]).unwrap();
        assert_eq!(*seen.borrow(), [(Some("Board"), Some(json!(1)))]);
    }

    #[test]
    fn test_locate_follows_list_steps() {
        let state = board();
        state.call("add", &[json!("a")]).unwrap();
        let list = Path::root().child("todos").child(LIST_FIELD);
        let live = state.ctx.live.borrow();
        assert_eq!(locate(&**live, &list.child(0usize)).map(|m| m.type_name()), Some("Todo"));
        assert!(locate(&**live, &list.child(1usize)).is_none());
        assert!(locate(&**live, &Path::root().child("nope")).is_none());
    }
}
