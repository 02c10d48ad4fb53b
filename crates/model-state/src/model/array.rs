use std::rc::Rc;

use serde_json::{json, Value};

use super::{class_of, Args, Class, Field, ListModel, Model, LIST_FIELD};
use crate::capture::capture;
use crate::error::ModelError;

/// Builds a list item from the arguments of a projected `push`.
pub type ItemFactory<T> = Rc<dyn Fn(&Args<'_>) -> Result<T, ModelError>>;

/// An ordered list of child models of one type.
///
/// The method names of `T` are captured when the list is created and stay
/// fixed; they are metadata, never part of captured state. Projections use
/// them to build the index-addressed item method table.
///
/// Array models of your own wrap an `ArrayModel<T>` and return it from
/// [`Model::list`] / [`Model::list_mut`]:
///
/// ```
/// use model_state::{ArrayModel, Class, Field, ListModel, Model};
/// # use serde_json::Value;
/// # struct Todo { done: bool }
/// # impl Model for Todo {
/// #     fn class() -> Class<Self> { Class::composite("Todo") }
/// #     fn fields(&self) -> Vec<(&'static str, Field<'_>)> { vec![("done", Field::plain(&self.done))] }
/// # }
/// struct TodoList {
///     todos: ArrayModel<Todo>,
/// }
///
/// impl Model for TodoList {
///     fn class() -> Class<Self> {
///         Class::array("TodoList")
///     }
///
///     fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
///         self.todos.fields()
///     }
///
///     fn list(&self) -> Option<&dyn ListModel> {
///         Some(&self.todos)
///     }
///
///     fn list_mut(&mut self) -> Option<&mut dyn ListModel> {
///         Some(&mut self.todos)
///     }
/// }
/// ```
///
/// Held directly as a nested model field, an `ArrayModel<T>` projects its own
/// container methods: `at(index)`, `pop()` / `pop(index, count = 1)` and,
/// when built with [`ArrayModel::with_factory`], `push(args...)`.
pub struct ArrayModel<T> {
    list: Vec<T>,
    model_methods: Vec<&'static str>,
    factory: Option<ItemFactory<T>>,
}

impl<T: Model> ArrayModel<T> {
    pub fn new() -> Self {
        Self {
            list: Vec::new(),
            model_methods: class_of::<T>().method_names(),
            factory: None,
        }
    }

    /// An empty list whose projected `push` builds items with `factory`.
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn(&Args<'_>) -> Result<T, ModelError> + 'static,
    {
        Self {
            factory: Some(Rc::new(factory)),
            ..Self::new()
        }
    }

    /// Append an item.
    pub fn push(&mut self, item: T) {
        self.list.push(item);
    }

    /// Remove and return the last item.
    pub fn pop(&mut self) -> Option<T> {
        self.list.pop()
    }

    /// Remove up to `count` items starting at `index`.
    ///
    /// Out-of-range bounds are clamped, so a stale index removes nothing.
    pub fn remove(&mut self, index: usize, count: usize) -> Vec<T> {
        let start = index.min(self.list.len());
        let end = start.saturating_add(count).min(self.list.len());
        self.list.drain(start..end).collect()
    }

    /// Item at `index`; negative indices count from the end.
    pub fn at(&self, index: isize) -> Option<&T> {
        self.resolve(index).and_then(|i| self.list.get(i))
    }

    pub fn at_mut(&mut self, index: isize) -> Option<&mut T> {
        self.resolve(index).and_then(|i| self.list.get_mut(i))
    }

    fn resolve(&self, index: isize) -> Option<usize> {
        if index >= 0 {
            Some(index.unsigned_abs())
        } else {
            self.list.len().checked_sub(index.unsigned_abs())
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.list.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.list.iter_mut()
    }

    pub fn items(&self) -> &[T] {
        &self.list
    }

    /// Method names of `T`, as captured at construction.
    pub fn model_methods(&self) -> &[&'static str] {
        &self.model_methods
    }

    /// The `list` field, for models that wrap this array.
    pub fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![(LIST_FIELD, Field::List(self))]
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ArrayModel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayModel")
            .field("list", &self.list)
            .field("model_methods", &self.model_methods)
            .field("factory", &self.factory.is_some())
            .finish()
    }
}

impl<T: Model> Default for ArrayModel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Model> FromIterator<T> for ArrayModel<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        array.list.extend(iter);
        array
    }
}

impl<T: Model> Extend<T> for ArrayModel<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.list.extend(iter);
    }
}

impl<'a, T> IntoIterator for &'a ArrayModel<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}

impl<T: Model> ListModel for ArrayModel<T> {
    fn len(&self) -> usize {
        self.list.len()
    }

    fn item(&self, index: usize) -> Option<&dyn Model> {
        self.list.get(index).map(|item| item as &dyn Model)
    }

    fn item_mut(&mut self, index: usize) -> Option<&mut dyn Model> {
        self.list.get_mut(index).map(|item| item as &mut dyn Model)
    }

    fn model_methods(&self) -> &[&'static str] {
        &self.model_methods
    }
}

impl<T: Model> Model for ArrayModel<T> {
    fn class() -> Class<Self> {
        Class::<Self>::array("ArrayModel")
            .method("at", |array, args| match array.at(args.arg(0)?) {
                Some(item) => capture(item),
                None => Ok(Value::Null),
            })
            .method("push", |array, args| {
                let factory = array.factory.clone().ok_or_else(|| {
                    ModelError::method("ArrayModel has no item factory for `push`")
                })?;
                array.push(factory(args)?);
                Ok(json!(array.len()))
            })
            .method("pop", |array, args| match args.get(0) {
                None | Some(Value::Null) => match array.pop() {
                    Some(item) => capture(&item),
                    None => Ok(Value::Null),
                },
                Some(_) => {
                    // Negative starts count from the end and clamp at zero.
                    let start = array.resolve(args.arg(0)?).unwrap_or(0);
                    array.remove(start, args.arg_or(1, 1usize)?);
                    Ok(Value::Null)
                }
            })
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        ArrayModel::fields(self)
    }

    fn list(&self) -> Option<&dyn ListModel> {
        Some(self)
    }

    fn list_mut(&mut self) -> Option<&mut dyn ListModel> {
        Some(self)
    }
}
