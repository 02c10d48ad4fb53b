use model_state_path::{get, parse_pointer, replace, Path, PathError, PathStep};
use serde_json::{json, Value};

#[test]
fn test_replace_nested_object_leaves_siblings_untouched() {
    let mut doc = json!({
        "title": "groceries",
        "todos": {"list": [{"done": false}, {"done": false}]},
        "owner": {"name": "sam"}
    });
    let before_owner = doc["owner"].clone();
    let before_title = doc["title"].clone();

    replace(&mut doc, &parse_pointer("/todos"), json!({"list": []})).unwrap();

    assert_eq!(doc["owner"], before_owner);
    assert_eq!(doc["title"], before_title);
    assert_eq!(doc["todos"], json!({"list": []}));
}

#[test]
fn test_replace_preserves_key_order() {
    let mut doc = json!({"a": 1, "b": 2, "c": 3});
    replace(&mut doc, &parse_pointer("/b"), json!(20)).unwrap();
    let keys: Vec<&String> = doc.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["a", "b", "c"]);
}

#[test]
fn test_replace_with_escaped_keys() {
    let mut doc = json!({"a/b": {"c~d": 1}});
    replace(&mut doc, &parse_pointer("/a~1b/c~0d"), json!(2)).unwrap();
    assert_eq!(doc, json!({"a/b": {"c~d": 2}}));
}

#[test]
fn test_replace_through_scalar_fails() {
    let mut doc = json!({"count": 1});
    let err = replace(&mut doc, &parse_pointer("/count/value/x"), json!(0)).unwrap_err();
    assert_eq!(err, PathError::NotFound);
}

#[test]
fn test_mixed_step_kinds_roundtrip_pointer() {
    let path: Path = vec![
        PathStep::Key("list".into()),
        PathStep::Index(0),
        PathStep::Key("price".into()),
    ]
    .into();
    assert_eq!(parse_pointer(&path.to_pointer()).to_pointer(), path.to_pointer());
}

#[test]
fn test_get_missing_index_is_none() {
    let doc = json!({"list": []});
    assert_eq!(get(&doc, &parse_pointer("/list/0")), None::<&Value>);
}
