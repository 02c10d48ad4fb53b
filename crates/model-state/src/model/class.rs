//! Per-type class descriptors and the class registry.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use super::{Args, Model, ModelKind};
use crate::capture::Snapshot;
use crate::error::ModelError;

/// A computed getter, evaluated against a plain snapshot of its model.
pub type Getter = Rc<dyn Fn(&Snapshot<'_>) -> Value>;

/// Getters keyed by name, in resolution order.
pub type Getters = IndexMap<&'static str, Getter>;

type Method<M> = Rc<dyn Fn(&mut M, &Args<'_>) -> Result<Value, ModelError>>;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::CompositeBase {}
    impl Sealed for super::ArrayBase {}
    impl Sealed for super::PrimitiveBase {}
}

/// Marker for the three root kinds a class chain ends in.
///
/// Sealed: implemented by exactly [`CompositeBase`], [`ArrayBase`] and
/// [`PrimitiveBase`].
pub trait BaseKind: sealed::Sealed {
    const KIND: ModelKind;
}

#[derive(Debug, Clone, Copy)]
pub struct CompositeBase;

#[derive(Debug, Clone, Copy)]
pub struct ArrayBase;

#[derive(Debug, Clone, Copy)]
pub struct PrimitiveBase;

impl BaseKind for CompositeBase {
    const KIND: ModelKind = ModelKind::Composite;
}

impl BaseKind for ArrayBase {
    const KIND: ModelKind = ModelKind::Array;
}

impl BaseKind for PrimitiveBase {
    const KIND: ModelKind = ModelKind::Primitive;
}

enum Parent<M> {
    Base(ModelKind),
    Class(Box<Class<M>>),
}

/// Methods and getters of a model type, with an optional chain of
/// user-level base classes.
///
/// A class is one level of a hierarchy. [`Class::subclass`] stacks a new
/// level on top of an existing class; lookups start at the most-derived level
/// and a name resolved at a lower level is never overridden by a base level.
/// The chain always ends in one of the three root kinds, whose own container
/// operations are never exposed as methods.
///
/// ```
/// use model_state::{Class, Field, Model};
/// use serde_json::Value;
///
/// struct Named {
///     name: String,
/// }
///
/// fn named<M: AsMut<Named> + 'static>() -> Class<M> {
///     Class::composite("Named").method("clear", |m: &mut M, _| {
///         m.as_mut().name.clear();
///         Ok(Value::Null)
///     })
/// }
///
/// struct User {
///     named: Named,
/// }
///
/// impl AsMut<Named> for User {
///     fn as_mut(&mut self) -> &mut Named {
///         &mut self.named
///     }
/// }
///
/// impl Model for User {
///     fn class() -> Class<Self> {
///         named::<User>().subclass("User")
///     }
///
///     fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
///         vec![("name", Field::plain(&self.named.name))]
///     }
/// }
///
/// assert_eq!(User::class().method_names(), ["clear"]);
/// ```
pub struct Class<M> {
    name: &'static str,
    parent: Parent<M>,
    methods: Vec<(&'static str, Method<M>)>,
    getters: Vec<(&'static str, Getter)>,
}

impl<M: 'static> Class<M> {
    /// A class directly on top of the root kind `B`.
    pub fn new<B: BaseKind>(name: &'static str) -> Self {
        Self {
            name,
            parent: Parent::Base(B::KIND),
            methods: Vec::new(),
            getters: Vec::new(),
        }
    }

    pub fn composite(name: &'static str) -> Self {
        Self::new::<CompositeBase>(name)
    }

    pub fn array(name: &'static str) -> Self {
        Self::new::<ArrayBase>(name)
    }

    pub fn primitive(name: &'static str) -> Self {
        Self::new::<PrimitiveBase>(name)
    }

    /// A new, more derived level whose base is `self`.
    #[must_use]
    pub fn subclass(self, name: &'static str) -> Self {
        Self {
            name,
            parent: Parent::Class(Box::new(self)),
            methods: Vec::new(),
            getters: Vec::new(),
        }
    }

    /// Declare a mutating method on this level.
    ///
    /// Redeclaring a name on the same level replaces the earlier definition.
    #[must_use]
    pub fn method<F>(mut self, name: &'static str, f: F) -> Self
    where
        F: Fn(&mut M, &Args<'_>) -> Result<Value, ModelError> + 'static,
    {
        let f: Method<M> = Rc::new(f);
        match self.methods.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = f,
            None => self.methods.push((name, f)),
        }
        self
    }

    /// Declare a computed getter on this level.
    #[must_use]
    pub fn getter<F>(mut self, name: &'static str, f: F) -> Self
    where
        F: Fn(&Snapshot<'_>) -> Value + 'static,
    {
        let f: Getter = Rc::new(f);
        match self.getters.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = f,
            None => self.getters.push((name, f)),
        }
        self
    }

    /// Name of the most-derived level.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The root kind the chain ends in.
    pub fn kind(&self) -> ModelKind {
        let mut level = self;
        loop {
            match &level.parent {
                Parent::Base(kind) => return *kind,
                Parent::Class(parent) => level = parent.as_ref(),
            }
        }
    }

    /// Levels from the most-derived class down to the one sitting on the root
    /// kind.
    fn levels(&self) -> impl Iterator<Item = &Class<M>> {
        std::iter::successors(Some(self), |&level| match &level.parent {
            Parent::Class(parent) => Some(parent.as_ref()),
            Parent::Base(_) => None,
        })
    }

    /// Mutating method names over the whole chain, most-derived first,
    /// each name once.
    pub fn method_names(&self) -> Vec<&'static str> {
        let names: IndexSet<&'static str> = self
            .levels()
            .flat_map(|level| level.methods.iter().map(|(name, _)| *name))
            .collect();
        names.into_iter().collect()
    }

    /// Getters over the whole chain; the nearest declaration of a name wins.
    pub fn getters(&self) -> Getters {
        let mut getters = Getters::new();
        for level in self.levels() {
            for (name, getter) in &level.getters {
                getters.entry(*name).or_insert_with(|| Rc::clone(getter));
            }
        }
        getters
    }

    fn find_method(&self, name: &str) -> Option<&Method<M>> {
        self.levels().find_map(|level| {
            level
                .methods
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, method)| method)
        })
    }

    /// Run method `name` on `model`.
    ///
    /// # Errors
    ///
    /// [`ModelError::UnknownMethod`] if no level declares `name`; otherwise
    /// whatever the method itself returns.
    pub fn call(&self, model: &mut M, name: &str, args: &Args<'_>) -> Result<Value, ModelError> {
        let method = self
            .find_method(name)
            .ok_or_else(|| ModelError::UnknownMethod {
                model: self.name.to_string(),
                method: name.to_string(),
            })?;
        method(model, args)
    }
}

impl<M> std::fmt::Debug for Class<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parent = match &self.parent {
            Parent::Base(kind) => format!("{kind:?}"),
            Parent::Class(parent) => parent.name.to_string(),
        };
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("parent", &parent)
            .field("methods", &self.methods.iter().map(|(n, _)| *n).collect::<Vec<_>>())
            .field("getters", &self.getters.iter().map(|(n, _)| *n).collect::<Vec<_>>())
            .finish()
    }
}

// ── Registry ──────────────────────────────────────────────────────────────

thread_local! {
    static CLASSES: RefCell<HashMap<TypeId, Rc<dyn Any>>> = RefCell::new(HashMap::new());
}

/// The class of `M`, built on first use and cached for the current thread.
pub fn class_of<M: Model>() -> Rc<Class<M>> {
    let id = TypeId::of::<M>();
    let cached = CLASSES.with(|classes| classes.borrow().get(&id).cloned());
    if let Some(class) = cached.and_then(|any| any.downcast::<Class<M>>().ok()) {
        return class;
    }
    // Built outside the registry borrow: M::class() may register item classes.
    let class = Rc::new(M::class());
    CLASSES.with(|classes| {
        classes
            .borrow_mut()
            .insert(id, Rc::clone(&class) as Rc<dyn Any>)
    });
    class
}
