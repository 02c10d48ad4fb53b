//! Paths into plain JSON state trees.
//!
//! A [`Path`] locates a subtree of a `serde_json::Value` by a sequence of
//! object keys and array indices. Besides navigation ([`get`], [`get_mut`])
//! this crate provides [`replace`], the single write primitive every state
//! store builds on: exactly one subtree is swapped and its siblings are left
//! untouched.
//!
//! Paths render as [JSON Pointers (RFC 6901)](https://tools.ietf.org/html/rfc6901).
//!
//! # Example
//!
//! ```
//! use model_state_path::{get, parse_pointer, replace, Path};
//! use serde_json::json;
//!
//! let mut doc = json!({"todos": {"list": [{"done": false}, {"done": false}]}});
//! let path = Path::root().child("todos").child("list").child(1);
//! assert_eq!(path.to_pointer(), "/todos/list/1");
//!
//! replace(&mut doc, &path, json!({"done": true})).unwrap();
//! assert_eq!(get(&doc, &parse_pointer("/todos/list/1/done")), Some(&json!(true)));
//! assert_eq!(get(&doc, &parse_pointer("/todos/list/0/done")), Some(&json!(false)));
//! ```

use serde_json::Value;
use thiserror::Error;

pub mod types;
pub use types::{Path, PathStep};

/// Unescapes a JSON Pointer path component.
///
/// Per RFC 6901, `~1` is replaced with `/` and `~0` is replaced with `~`.
///
/// ```
/// use model_state_path::unescape_component;
///
/// assert_eq!(unescape_component("a~0b"), "a~b");
/// assert_eq!(unescape_component("c~1d"), "c/d");
/// ```
pub fn unescape_component(component: &str) -> String {
    if !component.contains('~') {
        return component.to_string();
    }
    // ~1 first, otherwise "~01" would decode to "/"
    component.replace("~1", "/").replace("~0", "~")
}

/// Escapes a JSON Pointer path component.
///
/// ```
/// use model_state_path::escape_component;
///
/// assert_eq!(escape_component("a~b"), "a~0b");
/// assert_eq!(escape_component("c/d"), "c~1d");
/// ```
pub fn escape_component(component: &str) -> String {
    if !component.contains('/') && !component.contains('~') {
        return component.to_string();
    }
    component.replace('~', "~0").replace('/', "~1")
}

/// Parse a JSON Pointer into a [`Path`].
///
/// Every component becomes a [`PathStep::Key`]; keys that look like array
/// indices still address array elements during navigation. A pointer without
/// the leading `/` is accepted as relative to the root.
///
/// ```
/// use model_state_path::{parse_pointer, Path};
///
/// assert_eq!(parse_pointer(""), Path::root());
/// assert_eq!(parse_pointer("/a~1b/0").to_pointer(), "/a~1b/0");
/// assert_eq!(parse_pointer("a/b"), parse_pointer("/a/b"));
/// ```
pub fn parse_pointer(pointer: &str) -> Path {
    if pointer.is_empty() {
        return Path::root();
    }
    let body = pointer.strip_prefix('/').unwrap_or(pointer);
    body.split('/')
        .map(|component| PathStep::Key(unescape_component(component)))
        .collect()
}

/// Check if a string represents a valid non-negative integer array index.
///
/// ```
/// use model_state_path::is_valid_index;
///
/// assert!(is_valid_index("0"));
/// assert!(is_valid_index("123"));
/// assert!(!is_valid_index("-1"));
/// assert!(!is_valid_index("01"));
/// ```
pub fn is_valid_index(index: &str) -> bool {
    if index.is_empty() {
        return false;
    }
    let bytes = index.as_bytes();
    if bytes.len() > 1 && bytes[0] == b'0' {
        return false;
    }
    bytes.iter().all(|&b| b.is_ascii_digit())
}

/// Get a value from a state tree by path.
///
/// Returns `None` if any step is missing.
///
/// ```
/// use model_state_path::{get, Path};
/// use serde_json::json;
///
/// let doc = json!({"list": [1, 2, 3]});
/// assert_eq!(get(&doc, &Path::root().child("list").child(1)), Some(&json!(2)));
/// assert_eq!(get(&doc, &Path::root().child("list").child(3)), None);
/// ```
pub fn get<'a>(val: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut current = val;
    for step in path {
        current = match current {
            Value::Array(arr) => arr.get(step.as_index()?)?,
            Value::Object(map) => match step {
                PathStep::Key(key) => map.get(key)?,
                PathStep::Index(i) => map.get(&i.to_string())?,
            },
            _ => return None,
        };
    }
    Some(current)
}

/// Get a mutable reference to a value in a state tree by path.
pub fn get_mut<'a>(val: &'a mut Value, path: &Path) -> Option<&'a mut Value> {
    let mut current = val;
    for step in path {
        current = match current {
            Value::Array(arr) => arr.get_mut(step.as_index()?)?,
            Value::Object(map) => match step {
                PathStep::Key(key) => map.get_mut(key)?,
                PathStep::Index(i) => map.get_mut(&i.to_string())?,
            },
            _ => return None,
        };
    }
    Some(current)
}

/// Replace the subtree at `path` with `value`, returning the previous value
/// (`Value::Null` when the slot did not exist).
///
/// The parent of the target must exist. An object parent gains the key if it
/// was missing; an array parent accepts any existing index, or the index equal
/// to its length (or `-`), which appends.
///
/// # Errors
///
/// - [`PathError::NotFound`] if the parent path does not exist
/// - [`PathError::InvalidIndex`] if an array index is malformed or past the end
/// - [`PathError::NotAContainer`] if the parent is a scalar
///
/// ```
/// use model_state_path::{replace, Path};
/// use serde_json::json;
///
/// let mut doc = json!({"a": {"b": 1}, "c": 2});
/// let old = replace(&mut doc, &Path::root().child("a"), json!({"b": 5})).unwrap();
/// assert_eq!(old, json!({"b": 1}));
/// assert_eq!(doc, json!({"a": {"b": 5}, "c": 2}));
/// ```
pub fn replace(doc: &mut Value, path: &Path, value: Value) -> Result<Value, PathError> {
    let Some((last, init)) = path.steps().split_last() else {
        return Ok(std::mem::replace(doc, value));
    };
    let parent_path: Path = init.to_vec().into();
    let parent = get_mut(doc, &parent_path).ok_or(PathError::NotFound)?;
    match parent {
        Value::Object(map) => Ok(map.insert(last.to_key(), value).unwrap_or(Value::Null)),
        Value::Array(arr) => {
            let idx = if last.as_key() == Some("-") {
                arr.len()
            } else {
                last.as_index().ok_or(PathError::InvalidIndex)?
            };
            match idx.cmp(&arr.len()) {
                std::cmp::Ordering::Less => Ok(std::mem::replace(&mut arr[idx], value)),
                std::cmp::Ordering::Equal => {
                    arr.push(value);
                    Ok(Value::Null)
                }
                std::cmp::Ordering::Greater => Err(PathError::InvalidIndex),
            }
        }
        _ => Err(PathError::NotAContainer),
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("NOT_FOUND")]
    NotFound,
    #[error("INVALID_INDEX")]
    InvalidIndex,
    #[error("NO_PARENT")]
    NoParent,
    #[error("NOT_A_CONTAINER")]
    NotAContainer,
}
