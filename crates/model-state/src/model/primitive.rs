use std::ops::{Deref, DerefMut};

use serde::Serialize;

use super::{Class, Field, Model, VALUE_FIELD};

/// A model wrapping exactly one value.
///
/// Derefs to the wrapped value. Its projection reads the value back through
/// [`ModelState::value`](crate::ModelState::value).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimitiveModel<V> {
    value: V,
}

impl<V> PrimitiveModel<V> {
    pub fn new(value: V) -> Self {
        Self { value }
    }

    pub fn get(&self) -> &V {
        &self.value
    }

    pub fn set(&mut self, value: V) -> V {
        std::mem::replace(&mut self.value, value)
    }

    pub fn into_inner(self) -> V {
        self.value
    }
}

impl<V: Serialize + 'static> PrimitiveModel<V> {
    /// The `value` field, for models that wrap this primitive.
    pub fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![(VALUE_FIELD, Field::plain(&self.value))]
    }
}

impl<V> From<V> for PrimitiveModel<V> {
    fn from(value: V) -> Self {
        Self::new(value)
    }
}

impl<V> Deref for PrimitiveModel<V> {
    type Target = V;

    fn deref(&self) -> &V {
        &self.value
    }
}

impl<V> DerefMut for PrimitiveModel<V> {
    fn deref_mut(&mut self) -> &mut V {
        &mut self.value
    }
}

impl<V: Serialize + 'static> Model for PrimitiveModel<V> {
    fn class() -> Class<Self> {
        Class::primitive("PrimitiveModel")
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        PrimitiveModel::fields(self)
    }
}
