// ABOUTME: Unit tests for the BSON types module.
// ABOUTME: Tests ObjectId hex handling, datetimes, and special types through serde.

use crate::types::{element_type, Binary, DateTime, Decimal128, ObjectId, Regex, Timestamp};
use crate::{decode_document, doc, from_slice, to_vec, Document, Value};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[test]
fn test_object_id_hex() {
    let id = ObjectId::from_str("5f1a2b3c4d5e6f7a8b9c0d1e").unwrap();
    assert_eq!(id.to_hex(), "5f1a2b3c4d5e6f7a8b9c0d1e");
    assert_eq!(id.to_string(), "5f1a2b3c4d5e6f7a8b9c0d1e");
    assert_eq!(id.timestamp(), 0x5f1a_2b3c);
    assert_eq!(format!("{id:?}"), "ObjectId(5f1a2b3c4d5e6f7a8b9c0d1e)");
}

#[test]
fn test_object_id_rejects_bad_hex() {
    assert!(ObjectId::from_str("abc").is_err());
    assert!(ObjectId::from_str("zz1a2b3c4d5e6f7a8b9c0d1e").is_err());
}

#[test]
fn test_datetime_from_system_time() {
    let t = std::time::UNIX_EPOCH + std::time::Duration::from_millis(1_500);
    assert_eq!(DateTime::from(t).timestamp_millis(), 1_500);
}

#[test]
fn test_element_type_names() {
    assert_eq!(element_type::name(element_type::INT32), "int32");
    assert_eq!(element_type::name(element_type::STRING), "utf8 string");
    assert_eq!(element_type::name(0x42), "unknown");
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Record {
    id: ObjectId,
    created: DateTime,
    ts: Timestamp,
    pattern: Regex,
    blob: Binary,
    price: Decimal128,
}

fn sample_record() -> Record {
    Record {
        id: ObjectId::from_bytes([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]),
        created: DateTime::from_millis(1_600_000_000_000),
        ts: Timestamp { time: 7, increment: 3 },
        pattern: Regex::new("^ab", "i"),
        blob: Binary { subtype: 0x80, bytes: vec![0xde, 0xad] },
        price: Decimal128 { bytes: [9; 16] },
    }
}

#[test]
fn test_special_types_use_their_own_tags() {
    let bytes = to_vec(&sample_record()).unwrap();
    let document = decode_document(&bytes).unwrap();
    assert_eq!(document.get("id").map(Value::element_type), Some(element_type::OBJECT_ID));
    assert_eq!(document.get("created").map(Value::element_type), Some(element_type::DATETIME));
    assert_eq!(document.get("ts").map(Value::element_type), Some(element_type::TIMESTAMP));
    assert_eq!(document.get("pattern").map(Value::element_type), Some(element_type::REGEX));
    assert_eq!(document.get("blob").map(Value::element_type), Some(element_type::BINARY));
    assert_eq!(document.get("price").map(Value::element_type), Some(element_type::DECIMAL128));
}

#[test]
fn test_special_types_roundtrip_through_serde() {
    let record = sample_record();
    let bytes = to_vec(&record).unwrap();
    assert_eq!(from_slice::<Record>(&bytes).unwrap(), record);
}

#[test]
fn test_special_type_mismatch_is_an_error() {
    #[derive(Debug, Deserialize)]
    struct WantsId {
        #[allow(dead_code)]
        id: ObjectId,
    }

    let bytes = to_vec(&doc! { "id": "not an id" }).unwrap();
    let err = from_slice::<WantsId>(&bytes).unwrap_err();
    assert!(err.to_string().contains("expected object id"), "{err}");
}

#[test]
fn test_timestamp_wire_layout() {
    let document = doc! { "ts": (Timestamp { time: 1, increment: 2 }) };
    let bytes = crate::encode_document(&document).unwrap();
    // tag, "ts\0", then increment (low word) before time (high word)
    assert_eq!(&bytes[4..8], b"\x11ts\x00");
    assert_eq!(&bytes[8..16], &[2, 0, 0, 0, 1, 0, 0, 0]);
}

#[test]
fn test_special_types_through_foreign_serializer() {
    let record = sample_record();
    let json = serde_json::to_string(&record).unwrap();
    let back: Record = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);

    let document: Document = doc! { "id": (record.id) };
    let value: Value = serde_json::from_str::<Value>(&serde_json::to_string(&document).unwrap()).unwrap();
    assert!(value.is_document());
}

#[test]
fn test_object_id_rejects_signs() {
    assert!(ObjectId::from_str("+f+f+f+f+f+f+f+f+f+f+f+f").is_err());
    assert!(ObjectId::from_str("-10000000000000000000000").is_err());
    assert!(ObjectId::from_str("5F1A2B3C4D5E6F7A8B9C0D1E").is_ok());
}
