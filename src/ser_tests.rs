// ABOUTME: Unit tests for the BSON serializer module.
// ABOUTME: Tests serde integration for serializing Rust types to BSON documents.

use crate::encoder::Encoder;
use crate::error::Error;
use crate::ser::Serializer;
use crate::{decode_document, doc, to_vec, Value};
use serde::Serialize;
use std::collections::BTreeMap;

fn serialize<T: Serialize>(value: &T) -> Vec<u8> {
    let mut encoder = Encoder::new();
    value.serialize(&mut Serializer::new(&mut encoder)).unwrap();
    encoder.into_inner()
}

#[test]
fn test_serialize_int32_map() {
    let mut map = BTreeMap::new();
    map.insert("int", 1i32);
    assert_eq!(serialize(&map), b"\x0e\x00\x00\x00\x10int\x00\x01\x00\x00\x00\x00");
}

#[test]
fn test_serialize_int64_map() {
    let mut map = BTreeMap::new();
    map.insert("int64", 1i64);
    let bytes = serialize(&map);
    assert_eq!(bytes.len(), 20);
    assert_eq!(&bytes[..11], b"\x14\x00\x00\x00\x12int64\x00");
}

#[test]
fn test_serialize_struct() {
    #[derive(Serialize)]
    struct Point {
        x: i32,
        y: f64,
    }

    let bytes = serialize(&Point { x: 1, y: 2.0 });
    let mut expected = b"\x17\x00\x00\x00\x10x\x00\x01\x00\x00\x00\x01y\x00".to_vec();
    expected.extend_from_slice(&2.0f64.to_le_bytes());
    expected.push(0);
    assert_eq!(bytes, expected);
}

#[test]
fn test_serialize_option_fields() {
    #[derive(Serialize)]
    struct Maybe {
        a: Option<i32>,
        b: Option<i32>,
    }

    let document = decode_document(&serialize(&Maybe { a: None, b: Some(3) })).unwrap();
    assert_eq!(document, doc! { "a": null, "b": 3 });
}

#[test]
fn test_serialize_vec_as_array_document() {
    #[derive(Serialize)]
    struct Holder {
        v: Vec<u8>,
    }

    let bytes = serialize(&Holder { v: vec![7, 8] });
    // "v": array { "0": 7, "1": 8 }
    let array = b"\x13\x00\x00\x00\x100\x00\x07\x00\x00\x00\x101\x00\x08\x00\x00\x00\x00";
    assert_eq!(&bytes[4..7], b"\x04v\x00");
    assert_eq!(&bytes[7..7 + array.len()], array);
}

#[test]
fn test_integer_widths() {
    #[derive(Serialize)]
    struct Ints {
        a: u16,
        b: u32,
        c: u64,
    }

    let document = decode_document(&serialize(&Ints { a: 1, b: 2, c: 3 })).unwrap();
    assert_eq!(document.get("a"), Some(&Value::Int32(1)));
    assert_eq!(document.get("b"), Some(&Value::Int64(2)));
    assert_eq!(document.get("c"), Some(&Value::Int64(3)));
}

#[test]
fn test_u64_out_of_range() {
    let mut map = BTreeMap::new();
    map.insert("big", u64::MAX);
    assert_eq!(to_vec(&map).unwrap_err().error_type(), "unsupported_type");
}

#[test]
fn test_top_level_must_be_a_document() {
    assert_eq!(to_vec(&42i32), Err(Error::InvalidSource("int32".into())));
    assert_eq!(to_vec(&"s"), Err(Error::InvalidSource("utf8 string".into())));
    assert_eq!(to_vec(&vec![1, 2]), Err(Error::InvalidSource("array".into())));
    assert_eq!(to_vec(&None::<BTreeMap<String, i32>>), Err(Error::EncodeNil));
    assert_eq!(to_vec(&()), Err(Error::EncodeNil));
}

#[test]
fn test_enum_variants() {
    #[derive(Serialize)]
    enum Shape {
        Empty,
        Circle(f64),
        Rect { w: i32, h: i32 },
        Pair(i32, i32),
    }

    #[derive(Serialize)]
    struct Shapes {
        a: Shape,
        b: Shape,
        c: Shape,
        d: Shape,
    }

    let shapes = Shapes {
        a: Shape::Empty,
        b: Shape::Circle(1.5),
        c: Shape::Rect { w: 2, h: 3 },
        d: Shape::Pair(4, 5),
    };
    let document = decode_document(&serialize(&shapes)).unwrap();
    assert_eq!(
        document,
        doc! {
            "a": "Empty",
            "b": { "Circle": 1.5 },
            "c": { "Rect": { "w": 2, "h": 3 } },
            "d": { "Pair": [4, 5] }
        }
    );
}

#[test]
fn test_top_level_struct_variant() {
    #[derive(Serialize)]
    enum Event {
        Click { x: i32 },
    }

    let document = decode_document(&to_vec(&Event::Click { x: 9 }).unwrap()).unwrap();
    assert_eq!(document, doc! { "Click": { "x": 9 } });
}

#[test]
fn test_map_with_integer_keys() {
    let mut map = BTreeMap::new();
    map.insert(1u32, "one");
    map.insert(2u32, "two");
    let document = decode_document(&to_vec(&map).unwrap()).unwrap();
    assert_eq!(document, doc! { "1": "one", "2": "two" });
}

#[test]
fn test_interior_nul_in_key() {
    let mut map = BTreeMap::new();
    map.insert("a\0b", 1);
    assert_eq!(to_vec(&map), Err(Error::InteriorNul("a\0b".into())));
}

#[test]
fn test_serialize_value_document() {
    let value = Value::Document(doc! { "hello": "world" });
    assert_eq!(
        to_vec(&value).unwrap(),
        b"\x16\x00\x00\x00\x02hello\x00\x06\x00\x00\x00world\x00\x00"
    );
}
