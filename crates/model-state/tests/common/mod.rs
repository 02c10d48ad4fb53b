#![allow(dead_code)]

use model_state::{ArrayModel, Class, Field, ListModel, Model, ModelError, PrimitiveModel};
use serde_json::{json, Value};

pub struct Counter {
    pub count: i64,
}

impl Model for Counter {
    fn class() -> Class<Self> {
        Class::<Self>::composite("Counter")
            .method("increment", |c, _| {
                c.count += 1;
                Ok(Value::Null)
            })
            .method("add", |c, args| {
                c.count += args.arg::<i64>(0)?;
                Ok(json!(c.count))
            })
            .method("add_capped", |c, args| {
                c.count += args.arg::<i64>(0)?;
                if c.count > 100 {
                    return Err(ModelError::method("count over 100"));
                }
                Ok(json!(c.count))
            })
            .getter("double", |s| json!(s.i64("count").unwrap_or(0) * 2))
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![("count", Field::plain(&self.count))]
    }
}

pub struct Todo {
    pub title: String,
    pub done: bool,
}

impl Todo {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            done: false,
        }
    }
}

impl Model for Todo {
    fn class() -> Class<Self> {
        Class::<Self>::composite("Todo")
            .method("toggle", |todo, _| {
                todo.done = !todo.done;
                Ok(Value::Null)
            })
            .method("rename", |todo, args| {
                todo.title = args.arg(0)?;
                Ok(Value::Null)
            })
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![("title", Field::plain(&self.title)), ("done", Field::plain(&self.done))]
    }
}

/// An array model of todos with list-level methods of its own.
pub struct TodoList {
    pub todos: ArrayModel<Todo>,
}

impl TodoList {
    pub fn with(titles: &[&str]) -> Self {
        Self {
            todos: titles.iter().map(|t| Todo::new(t)).collect(),
        }
    }
}

impl Model for TodoList {
    fn class() -> Class<Self> {
        Class::<Self>::array("TodoList")
            .method("add", |list, args| {
                list.todos.push(Todo::new(&args.arg::<String>(0)?));
                Ok(json!(list.todos.len()))
            })
            .method("drop_last", |list, _| {
                list.todos.pop();
                Ok(Value::Null)
            })
            .method("clear_done", |list, _| {
                let kept: Vec<Todo> = list.todos.remove(0, list.todos.len());
                list.todos.extend(kept.into_iter().filter(|t| !t.done));
                Ok(Value::Null)
            })
            .getter("remaining", |s| {
                let remaining = s
                    .array("list")
                    .map_or(0, |list| list.iter().filter(|t| t["done"] == json!(false)).count());
                json!(remaining)
            })
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        self.todos.fields()
    }

    fn list(&self) -> Option<&dyn ListModel> {
        Some(&self.todos)
    }

    fn list_mut(&mut self) -> Option<&mut dyn ListModel> {
        Some(&mut self.todos)
    }
}

/// A composite model with a nested primitive model.
pub struct Product {
    pub name: String,
    pub price: PrimitiveModel<f64>,
    pub stock: u32,
}

impl Model for Product {
    fn class() -> Class<Self> {
        Class::<Self>::composite("Product")
            .method("restock", |p, args| {
                p.stock += args.arg_or(0, 1u32)?;
                Ok(json!(p.stock))
            })
            .method("reprice", |p, args| {
                let price: f64 = args.arg(0)?;
                if price < 0.0 {
                    return Err(ModelError::method("negative price"));
                }
                p.price.set(price);
                Ok(Value::Null)
            })
            .getter("in_stock", |s| json!(s.i64("stock").unwrap_or(0) > 0))
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("name", Field::plain(&self.name)),
            ("price", Field::model(&self.price)),
            ("stock", Field::plain(&self.stock)),
        ]
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut dyn Model> {
        match name {
            "price" => Some(&mut self.price),
            _ => None,
        }
    }
}

pub fn product() -> Product {
    Product {
        name: "lamp".into(),
        price: 19.5.into(),
        stock: 0,
    }
}

/// A store front nesting every model kind.
pub struct Shop {
    pub featured: Product,
    pub backlog: TodoList,
    pub owner: PrimitiveModel<String>,
}

impl Model for Shop {
    fn class() -> Class<Self> {
        Class::<Self>::composite("Shop").method("transfer", |shop, args| {
            shop.owner.set(args.arg(0)?);
            Ok(Value::Null)
        })
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("featured", Field::model(&self.featured)),
            ("backlog", Field::model(&self.backlog)),
            ("owner", Field::model(&self.owner)),
        ]
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut dyn Model> {
        match name {
            "featured" => Some(&mut self.featured),
            "backlog" => Some(&mut self.backlog),
            "owner" => Some(&mut self.owner),
            _ => None,
        }
    }
}

pub fn shop() -> Shop {
    Shop {
        featured: product(),
        backlog: TodoList::with(&["paint", "ship"]),
        owner: "ada".to_string().into(),
    }
}
