// ABOUTME: Unit tests for the BSON value module.
// ABOUTME: Tests Value accessors, conversions, Document semantics, and the bson!/doc! macros.

use crate::{bson, doc, Document, ObjectId, Value};

#[test]
fn test_value_kinds() {
    assert!(Value::Null.is_null());
    assert!(Value::Int32(1).is_number());
    assert!(Value::Int64(1).is_number());
    assert!(Value::Double(2.5).is_number());
    assert!(Value::Array(vec![]).is_array());
    assert!(Value::Document(Document::new()).is_document());
    assert_eq!(Value::Int32(1).kind(), "int32");
    assert_eq!(Value::String("x".into()).kind(), "utf8 string");
}

#[test]
fn test_value_accessors() {
    assert_eq!(Value::Boolean(true).as_bool(), Some(true));
    assert_eq!(Value::Int32(42).as_i32(), Some(42));
    assert_eq!(Value::Int32(42).as_i64(), Some(42));
    assert_eq!(Value::Int64(42).as_i32(), None);
    assert_eq!(Value::Double(2.5).as_f64(), Some(2.5));
    assert_eq!(Value::String("hello".into()).as_str(), Some("hello"));
    assert_eq!(Value::Null.as_str(), None);
}

#[test]
fn test_value_from() {
    assert_eq!(Value::from(7i32), Value::Int32(7));
    assert_eq!(Value::from(7u8), Value::Int32(7));
    assert_eq!(Value::from(7i64), Value::Int64(7));
    assert_eq!(Value::from(7u32), Value::Int64(7));
    assert_eq!(Value::from(1.5f64), Value::Double(1.5));
    assert_eq!(Value::from("s"), Value::String("s".into()));
    assert_eq!(Value::from(None::<i32>), Value::Null);
    assert_eq!(Value::from(Some(3)), Value::Int32(3));
    assert_eq!(
        Value::from(vec![1, 2]),
        Value::Array(vec![Value::Int32(1), Value::Int32(2)])
    );
}

#[test]
fn test_bson_macro() {
    assert!(bson!(null).is_null());
    assert_eq!(bson!(true), Value::Boolean(true));

    let v = bson!([1, 2, 3]);
    assert_eq!(v.get(0).and_then(Value::as_i32), Some(1));

    let v = bson!({
        "name": "test",
        "nested": { "value": 42 }
    });
    assert_eq!(v.get_key("name").and_then(Value::as_str), Some("test"));
    assert_eq!(
        v.get_key("nested").and_then(|n| n.get_key("value")).and_then(Value::as_i32),
        Some(42)
    );
}

#[test]
fn test_document_keeps_insertion_order() {
    let d = doc! { "z": 1, "a": 2, "m": 3 };
    assert_eq!(d.keys().collect::<Vec<_>>(), ["z", "a", "m"]);
}

#[test]
fn test_document_insert_overwrites_in_place() {
    let mut d = doc! { "a": 1, "b": 2 };
    assert_eq!(d.insert("a", 10), Some(Value::Int32(1)));
    assert_eq!(d.keys().collect::<Vec<_>>(), ["a", "b"]);
    assert_eq!(d.get_i32("a"), Some(10));
    assert_eq!(d.len(), 2);
}

#[test]
fn test_document_equality_ignores_order() {
    assert_eq!(doc! { "a": 1, "b": "x" }, doc! { "b": "x", "a": 1 });
    assert_ne!(doc! { "a": 1 }, doc! { "a": 1i64 });
}

#[test]
fn test_document_typed_getters() {
    let d = doc! {
        "s": "str",
        "i": 1,
        "l": 2i64,
        "f": 1.5,
        "b": false,
        "d": { "x": null },
        "arr": [1, 2]
    };
    assert_eq!(d.get_str("s"), Some("str"));
    assert_eq!(d.get_i32("i"), Some(1));
    assert_eq!(d.get_i64("l"), Some(2));
    assert_eq!(d.get_i64("i"), Some(1));
    assert_eq!(d.get_f64("f"), Some(1.5));
    assert_eq!(d.get_bool("b"), Some(false));
    assert!(d.get_document("d").is_some_and(|inner| inner.contains_key("x")));
    assert_eq!(d.get_array("arr").map(Vec::len), Some(2));
    assert_eq!(d.get_str("i"), None);
}

#[test]
fn test_document_remove_and_iter() {
    let mut d: Document = vec![("a", 1), ("b", 2), ("c", 3)].into_iter().collect();
    assert_eq!(d.remove("b"), Some(Value::Int32(2)));
    let pairs: Vec<(String, Value)> = d.into_iter().collect();
    assert_eq!(
        pairs,
        vec![("a".to_string(), Value::Int32(1)), ("c".to_string(), Value::Int32(3))]
    );
}

#[test]
fn test_display() {
    let id = ObjectId::from_bytes([0; 12]);
    let d = doc! { "n": 1, "s": "x", "id": id, "l": [true, null] };
    assert_eq!(
        d.to_string(),
        r#"{"n": 1, "s": "x", "id": ObjectId("000000000000000000000000"), "l": [true, null]}"#
    );
}
