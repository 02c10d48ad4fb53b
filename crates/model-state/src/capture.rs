//! Plain snapshots of live models.
//!
//! [`capture`] turns a model tree into the plain `serde_json::Value` handed to
//! a store: nested models become nested objects, an array model's `list`
//! becomes an array of item snapshots, every other field is serialized as-is.
//! Item method names are metadata and never appear in a snapshot.
//!
//! Computed getters are not stored. A [`Snapshot`] re-attaches them to one
//! level of plain state, so a getter always runs against captured state and
//! never against the live model, and a getter may read other getters.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ModelError;
use crate::model::{Field, Getters, Model};

/// Capture the current state of `model` as plain data.
///
/// # Errors
///
/// [`ModelError::Snapshot`] if a plain field cannot be represented.
pub fn capture(model: &dyn Model) -> Result<Value, ModelError> {
    let mut map = Map::new();
    for (name, field) in model.fields() {
        let value = match field {
            Field::Model(child) => capture(child)?,
            Field::List(list) => {
                let mut items = Vec::with_capacity(list.len());
                for index in 0..list.len() {
                    if let Some(item) = list.item(index) {
                        items.push(capture(item)?);
                    }
                }
                Value::Array(items)
            }
            Field::Plain(value) => value.to_plain()?,
        };
        map.insert(name.to_string(), value);
    }
    Ok(Value::Object(map))
}

/// One level of captured state with its computed getters attached.
#[derive(Clone, Copy)]
pub struct Snapshot<'a> {
    data: &'a Value,
    getters: &'a Getters,
}

impl<'a> Snapshot<'a> {
    pub fn new(data: &'a Value, getters: &'a Getters) -> Self {
        Self { data, getters }
    }

    /// The plain data, without getters.
    pub fn data(&self) -> &'a Value {
        self.data
    }

    /// A stored field, without consulting getters.
    pub fn field(&self, name: &str) -> Option<&'a Value> {
        self.data.get(name)
    }

    /// Field `name`: stored data first, then a getter evaluated against this
    /// snapshot.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.data.get(name) {
            return Some(value.clone());
        }
        self.getters.get(name).map(|getter| getter(self))
    }

    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|value| serde_json::from_value(value).ok())
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name)?.as_i64()
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name)?.as_f64()
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name)?.as_bool()
    }

    pub fn string(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Items of an array field.
    pub fn array(&self, name: &str) -> Option<&'a Vec<Value>> {
        self.data.get(name)?.as_array()
    }

    /// The data with every getter evaluated and attached as a plain field.
    pub fn resolve(&self) -> Value {
        let mut out = match self.data {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        for name in self.getters.keys() {
            if !out.contains_key(*name) {
                if let Some(value) = self.get(name) {
                    out.insert((*name).to_string(), value);
                }
            }
        }
        Value::Object(out)
    }
}

impl std::fmt::Debug for Snapshot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("data", self.data)
            .field("getters", &self.getters.keys().collect::<Vec<_>>())
            .finish()
    }
}
