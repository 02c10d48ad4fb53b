//! Model capabilities.
//!
//! # Overview
//!
//! A model is a node of an application-defined object tree. Nothing about its
//! shape is declared in a separate schema: each model type answers three
//! questions about itself through the [`Model`] trait.
//!
//! - which data fields it owns, in order ([`Model::fields`]);
//! - how to reach a nested model for mutation ([`Model::child_mut`]);
//! - for array models, how to reach the item list ([`Model::list`]).
//!
//! Methods and computed getters live on the per-type [`Class`] descriptor
//! returned by [`Model::class`]. The erased half of the capability
//! ([`Reflect`]) is provided for every model by a blanket impl, so a
//! `&dyn Model` can be introspected and have its methods invoked by name.
//!
//! Three root kinds exist: composite, array ([`ArrayModel`]) and primitive
//! ([`PrimitiveModel`]).

mod args;
mod array;
mod class;
mod primitive;

pub use args::Args;
pub use array::{ArrayModel, ItemFactory};
pub use class::{
    class_of, ArrayBase, BaseKind, Class, CompositeBase, Getter, Getters, PrimitiveBase,
};
pub use primitive::PrimitiveModel;

use serde::Serialize;
use serde_json::Value;

use crate::error::ModelError;

/// Name of the item list field of every array model.
pub const LIST_FIELD: &str = "list";
/// Name of the single field of every primitive model.
pub const VALUE_FIELD: &str = "value";

/// Root kind of a model type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Composite,
    Array,
    Primitive,
}

/// Classification of a field value, matched exhaustively by the capture and
/// projection walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Composite,
    Array,
    Primitive,
    /// Anything that is not a model, including an array model's item list.
    Plain,
}

impl From<ModelKind> for FieldKind {
    fn from(kind: ModelKind) -> Self {
        match kind {
            ModelKind::Composite => FieldKind::Composite,
            ModelKind::Array => FieldKind::Array,
            ModelKind::Primitive => FieldKind::Primitive,
        }
    }
}

/// A node of a model tree.
///
/// # Example
///
/// ```
/// use model_state::{Class, Field, Model};
/// use serde_json::{json, Value};
///
/// #[derive(Default)]
/// struct Counter {
///     count: i64,
/// }
///
/// impl Model for Counter {
///     fn class() -> Class<Self> {
///         Class::<Self>::composite("Counter")
///             .method("increment", |c, _| {
///                 c.count += 1;
///                 Ok(Value::Null)
///             })
///             .getter("double", |s| json!(s.i64("count").unwrap_or(0) * 2))
///     }
///
///     fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
///         vec![("count", Field::plain(&self.count))]
///     }
/// }
/// ```
pub trait Model: Reflect + 'static {
    /// Declares the methods, getters and base kind of this type.
    ///
    /// Built once per thread and cached, see [`class_of`].
    fn class() -> Class<Self>
    where
        Self: Sized;

    /// Own data fields in declaration order.
    fn fields(&self) -> Vec<(&'static str, Field<'_>)>;

    /// The nested model stored in field `name`, if any.
    fn child_mut(&mut self, name: &str) -> Option<&mut dyn Model> {
        let _ = name;
        None
    }

    /// The item list of an array model.
    fn list(&self) -> Option<&dyn ListModel> {
        None
    }

    fn list_mut(&mut self) -> Option<&mut dyn ListModel> {
        None
    }
}

/// Type-erased view of a model's [`Class`].
///
/// Implemented for every [`Model`]; there is no reason to implement it by hand.
pub trait Reflect {
    fn type_name(&self) -> &'static str;

    fn kind(&self) -> ModelKind;

    /// Mutating method names, most-derived first, deduplicated.
    fn method_names(&self) -> Vec<&'static str>;

    /// Computed getters, nearest declaration wins.
    fn getters(&self) -> Getters;

    /// Run the method `method` on this model.
    fn invoke(&mut self, method: &str, args: &Args<'_>) -> Result<Value, ModelError>;
}

impl<M: Model> Reflect for M {
    fn type_name(&self) -> &'static str {
        class_of::<M>().name()
    }

    fn kind(&self) -> ModelKind {
        class_of::<M>().kind()
    }

    fn method_names(&self) -> Vec<&'static str> {
        class_of::<M>().method_names()
    }

    fn getters(&self) -> Getters {
        class_of::<M>().getters()
    }

    fn invoke(&mut self, method: &str, args: &Args<'_>) -> Result<Value, ModelError> {
        class_of::<M>().call(self, method, args)
    }
}

/// A value that can be copied into plain state.
///
/// Blanket-implemented for every `Serialize` type.
pub trait PlainValue {
    fn to_plain(&self) -> Result<Value, serde_json::Error>;
}

impl<T: Serialize + ?Sized> PlainValue for T {
    fn to_plain(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// The item list of an array model.
pub trait ListModel {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn item(&self, index: usize) -> Option<&dyn Model>;

    fn item_mut(&mut self, index: usize) -> Option<&mut dyn Model>;

    /// Method names of the item type, frozen when the list was created.
    fn model_methods(&self) -> &[&'static str];
}

/// One data field of a model.
pub enum Field<'a> {
    /// A nested model.
    Model(&'a dyn Model),
    /// The item list of an array model.
    List(&'a dyn ListModel),
    /// Any other value, copied into state through `serde`.
    Plain(&'a dyn PlainValue),
}

impl<'a> Field<'a> {
    pub fn plain<T: Serialize>(value: &'a T) -> Self {
        Field::Plain(value)
    }

    pub fn model<M: Model>(model: &'a M) -> Self {
        Field::Model(model)
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::Model(model) => model.kind().into(),
            Field::List(_) | Field::Plain(_) => FieldKind::Plain,
        }
    }
}

impl std::fmt::Debug for Field<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Model(model) => write!(f, "Model({})", model.type_name()),
            Field::List(list) => write!(f, "List(len={})", list.len()),
            Field::Plain(value) => match value.to_plain() {
                Ok(v) => write!(f, "Plain({v})"),
                Err(_) => f.write_str("Plain(<unrepresentable>)"),
            },
        }
    }
}
