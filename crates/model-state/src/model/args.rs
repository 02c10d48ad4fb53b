use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ModelError;

/// Positional arguments of a projected method call.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub fn new(values: &'a [Value]) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a Value> {
        self.values.get(index)
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    /// Argument `index` deserialized as `T`.
    ///
    /// # Errors
    ///
    /// [`ModelError::MissingArgument`] when fewer arguments were passed,
    /// [`ModelError::BadArgument`] when the value does not fit `T`.
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> Result<T, ModelError> {
        let value = self
            .values
            .get(index)
            .ok_or(ModelError::MissingArgument(index))?;
        T::deserialize(value).map_err(|source| ModelError::BadArgument { index, source })
    }

    /// Like [`Args::arg`], but a missing or `null` argument yields `default`.
    pub fn arg_or<T: DeserializeOwned>(&self, index: usize, default: T) -> Result<T, ModelError> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(default),
            Some(_) => self.arg(index),
        }
    }
}
