//! Flattened plain view of a whole projection.
//!
//! The facade is the shape a template layer binds against: primitive models
//! collapse to their value and array models to their items, with the nested
//! model still reachable under the field name prefixed by `_`. Getters are
//! attached as plain values.

use std::rc::Rc;

use serde_json::{Map, Value};

use crate::capture::Snapshot;
use crate::model::{Getters, ModelKind, LIST_FIELD, VALUE_FIELD};
use crate::project::{ModelState, Slot};
use crate::store::Derived;

enum FacadeField {
    Plain,
    Nested(ModelKind, FacadeShape),
}

/// The static part of a facade: field layout and getters of every level.
struct FacadeShape {
    fields: Vec<(&'static str, FacadeField)>,
    getters: Rc<Getters>,
}

impl FacadeShape {
    fn of(state: &ModelState) -> Self {
        let fields = state
            .slots
            .iter()
            .filter_map(|(name, slot)| match slot {
                Slot::Model(child) => Some((*name, FacadeField::Nested(child.kind, Self::of(child)))),
                Slot::Field => Some((*name, FacadeField::Plain)),
                Slot::Getter => None,
            })
            .collect();
        Self {
            fields,
            getters: Rc::clone(&state.getters),
        }
    }

    fn render(&self, data: &Value) -> Value {
        let mut out = Map::new();
        for (name, field) in &self.fields {
            let value = data.get(*name).unwrap_or(&Value::Null);
            match field {
                FacadeField::Plain => {
                    out.insert((*name).to_string(), value.clone());
                }
                FacadeField::Nested(ModelKind::Composite, shape) => {
                    out.insert((*name).to_string(), shape.render(value));
                }
                FacadeField::Nested(ModelKind::Primitive, shape) => {
                    let inner = value.get(VALUE_FIELD).cloned().unwrap_or(Value::Null);
                    out.insert((*name).to_string(), inner);
                    out.insert(format!("_{name}"), shape.render(value));
                }
                FacadeField::Nested(ModelKind::Array, shape) => {
                    let items = value.get(LIST_FIELD).cloned().unwrap_or(Value::Null);
                    out.insert((*name).to_string(), items);
                    out.insert(format!("_{name}"), shape.render(value));
                }
            }
        }
        let snapshot = Snapshot::new(data, &self.getters);
        for name in self.getters.keys() {
            let value = snapshot.get(name).unwrap_or(Value::Null);
            out.insert((*name).to_string(), value);
        }
        Value::Object(out)
    }
}

impl ModelState {
    /// A derived plain view of this model, recomputed after store writes.
    pub fn facade(&self) -> Derived<Value> {
        let shape = FacadeShape::of(self);
        let path = self.path.clone();
        Derived::new(self.store(), move |root| {
            let data = model_state_path::get(root, &path).unwrap_or(&Value::Null);
            shape.render(data)
        })
    }
}
