//! Shape discovery and validation of model instances.
//!
//! The shape of a model is read from the instance, never from a schema: its
//! data fields come from [`Model::fields`], its methods and getters from the
//! class chain. [`validate`] checks a whole tree once, before any store is
//! built.

use std::collections::HashSet;

use crate::error::ModelError;
use crate::model::{Field, Getters, Model, ModelKind, LIST_FIELD, VALUE_FIELD};

/// What one model level exposes.
pub struct Shape {
    pub type_name: &'static str,
    pub kind: ModelKind,
    /// Mutating methods, most-derived first.
    pub methods: Vec<&'static str>,
    pub getters: Getters,
    /// Data fields in declaration order.
    pub data: Vec<&'static str>,
}

impl Shape {
    /// Data fields followed by getter names.
    pub fn field_names(&self) -> Vec<&'static str> {
        self.data
            .iter()
            .copied()
            .chain(self.getters.keys().copied())
            .collect()
    }
}

impl std::fmt::Debug for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shape")
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .field("methods", &self.methods)
            .field("getters", &self.getters.keys().collect::<Vec<_>>())
            .field("data", &self.data)
            .finish()
    }
}

/// The shape of one model level.
pub fn introspect(model: &dyn Model) -> Shape {
    Shape {
        type_name: model.type_name(),
        kind: model.kind(),
        methods: model.method_names(),
        getters: model.getters(),
        data: model.fields().into_iter().map(|(name, _)| name).collect(),
    }
}

/// Check that `model` and everything below it forms a valid tree.
///
/// # Errors
///
/// [`ModelError::InvalidModel`] naming the first offending model.
pub fn validate(model: &mut dyn Model) -> Result<(), ModelError> {
    let children = check_level(model)?;
    let type_name = model.type_name();
    for name in children {
        let child = model.child_mut(name).ok_or_else(|| {
            ModelError::invalid(
                type_name,
                format!("field `{name}` holds a model but child_mut does not reach it"),
            )
        })?;
        validate(child)?;
    }
    if let Some(list) = model.list_mut() {
        for index in 0..list.len() {
            if let Some(item) = list.item_mut(index) {
                validate(item)?;
            }
        }
    }
    Ok(())
}

/// Checks of a single level; returns the names of its nested-model fields.
fn check_level(model: &dyn Model) -> Result<Vec<&'static str>, ModelError> {
    let name = model.type_name();
    let kind = model.kind();
    let fields = model.fields();

    let mut seen = HashSet::new();
    for (field, _) in &fields {
        if !seen.insert(*field) {
            return Err(ModelError::invalid(name, format!("duplicate field `{field}`")));
        }
    }
    for getter in model.getters().keys() {
        if seen.contains(getter) {
            return Err(ModelError::invalid(
                name,
                format!("getter `{getter}` shadows a data field"),
            ));
        }
    }

    match kind {
        ModelKind::Array => {
            if model.list().is_none() {
                return Err(ModelError::invalid(name, "array model without a list"));
            }
            let has_list = fields
                .iter()
                .any(|(field, value)| *field == LIST_FIELD && matches!(value, Field::List(_)));
            if !has_list {
                return Err(ModelError::invalid(
                    name,
                    format!("array model must expose its list as field `{LIST_FIELD}`"),
                ));
            }
        }
        ModelKind::Primitive | ModelKind::Composite => {
            if kind == ModelKind::Primitive && !seen.contains(VALUE_FIELD) {
                return Err(ModelError::invalid(
                    name,
                    format!("primitive model without a `{VALUE_FIELD}` field"),
                ));
            }
            if model.list().is_some() {
                return Err(ModelError::invalid(name, "list on a non-array model"));
            }
            let list_field = fields
                .iter()
                .find(|(_, value)| matches!(value, Field::List(_)));
            if let Some((field, _)) = list_field {
                return Err(ModelError::invalid(
                    name,
                    format!("list field `{field}` on a non-array model"),
                ));
            }
        }
    }

    Ok(fields
        .iter()
        .filter(|(_, value)| matches!(value, Field::Model(_)))
        .map(|(field, _)| *field)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArrayModel, Class, ListModel, PrimitiveModel};
    use serde_json::{json, Value};

    struct Leaf {
        n: u32,
    }

    impl Model for Leaf {
        fn class() -> Class<Self> {
            Class::<Self>::composite("Leaf")
                .method("inc", |leaf, _| {
                    leaf.n += 1;
                    Ok(Value::Null)
                })
                .getter("twice", |s| json!(s.i64("n").unwrap_or(0) * 2))
        }

        fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
            vec![("n", Field::plain(&self.n))]
        }
    }

    struct Tree {
        leaf: Leaf,
        label: PrimitiveModel<String>,
    }

    impl Model for Tree {
        fn class() -> Class<Self> {
            Class::composite("Tree")
        }

        fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
            vec![("leaf", Field::model(&self.leaf)), ("label", Field::model(&self.label))]
        }

        fn child_mut(&mut self, name: &str) -> Option<&mut dyn Model> {
            match name {
                "leaf" => Some(&mut self.leaf),
                "label" => Some(&mut self.label),
                _ => None,
            }
        }
    }

    #[test]
    fn test_shape_lists_data_then_getters() {
        let shape = introspect(&Leaf { n: 1 });
        assert_eq!(shape.type_name, "Leaf");
        assert_eq!(shape.kind, ModelKind::Composite);
        assert_eq!(shape.methods, ["inc"]);
        assert_eq!(shape.field_names(), ["n", "twice"]);
    }

    #[test]
    fn test_valid_tree() {
        let mut tree = Tree { leaf: Leaf { n: 0 }, label: "x".to_string().into() };
        validate(&mut tree).unwrap();
    }

    #[test]
    fn test_unreachable_child_is_invalid() {
        struct Sealed {
            leaf: Leaf,
        }

        impl Model for Sealed {
            fn class() -> Class<Self> {
                Class::composite("Sealed")
            }

            fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
                vec![("leaf", Field::model(&self.leaf))]
            }
        }

        let err = validate(&mut Sealed { leaf: Leaf { n: 0 } }).unwrap_err();
        assert!(matches!(err, ModelError::InvalidModel { model: "Sealed", .. }));
    }

    #[test]
    fn test_duplicate_and_shadowing_fields() {
        struct Dup {
            a: u8,
        }

        impl Model for Dup {
            fn class() -> Class<Self> {
                Class::composite("Dup")
            }

            fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
                vec![("a", Field::plain(&self.a)), ("a", Field::plain(&self.a))]
            }
        }

        struct Shadow {
            twice: u8,
        }

        impl Model for Shadow {
            fn class() -> Class<Self> {
                Class::composite("Shadow").getter("twice", |_| json!(0))
            }

            fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
                vec![("twice", Field::plain(&self.twice))]
            }
        }

        assert!(validate(&mut Dup { a: 1 }).is_err());
        assert!(validate(&mut Shadow { twice: 1 }).is_err());
    }

    #[test]
    fn test_array_without_list_is_invalid() {
        struct Hollow;

        impl Model for Hollow {
            fn class() -> Class<Self> {
                Class::array("Hollow")
            }

            fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
                Vec::new()
            }
        }

        struct Stray {
            items: ArrayModel<Leaf>,
        }

        impl Model for Stray {
            fn class() -> Class<Self> {
                Class::composite("Stray")
            }

            fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
                self.items.fields()
            }

            fn list(&self) -> Option<&dyn ListModel> {
                Some(&self.items)
            }
        }

        assert!(validate(&mut Hollow).is_err());
        assert!(validate(&mut Stray { items: ArrayModel::new() }).is_err());
    }

    #[test]
    fn test_list_field_on_composite_is_invalid() {
        struct Loose {
            items: ArrayModel<Leaf>,
        }

        impl Model for Loose {
            fn class() -> Class<Self> {
                Class::composite("Loose")
            }

            fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
                vec![("items", Field::List(&self.items))]
            }
        }

        let err = validate(&mut Loose { items: ArrayModel::new() }).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid model `Loose`: list field `items` on a non-array model"
        );
    }

    #[test]
    fn test_primitive_without_value_is_invalid() {
        struct Bare {
            v: u8,
        }

        impl Model for Bare {
            fn class() -> Class<Self> {
                Class::primitive("Bare")
            }

            fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
                vec![("v", Field::plain(&self.v))]
            }
        }

        let err = validate(&mut Bare { v: 0 }).unwrap_err();
        assert_eq!(err.to_string(), "invalid model `Bare`: primitive model without a `value` field");
    }

    #[test]
    fn test_items_are_validated() {
        struct BadItem;

        impl Model for BadItem {
            fn class() -> Class<Self> {
                Class::primitive("BadItem")
            }

            fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
                Vec::new()
            }
        }

        let mut items: ArrayModel<BadItem> = ArrayModel::new();
        validate(&mut items).unwrap();
        items.push(BadItem);
        assert!(validate(&mut items).is_err());
    }
}
