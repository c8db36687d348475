// ABOUTME: Benchmark comparing BSON codec performance against serde_json.
// ABOUTME: Also measures raw element scanning, the Document model, and stream framing.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde::{Deserialize, Serialize};
use serde_bson::decoder::document_elements;
use serde_bson::{decode_document, encode_document, ElementCursor, StreamDecoder};
use std::io::Cursor;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct SimpleStruct {
    name: String,
    age: u32,
    active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ComplexStruct {
    id: u64,
    name: String,
    email: String,
    scores: Vec<i32>,
    metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Metadata {
    created: String,
    updated: String,
    tags: Vec<String>,
    rating: f64,
}

// A BSON document cannot be a bare array, so collections are wrapped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Wrapper<T> {
    items: Vec<T>,
}

fn create_simple_data() -> SimpleStruct {
    SimpleStruct {
        name: "Alice".to_string(),
        age: 30,
        active: true,
    }
}

fn create_complex_data() -> ComplexStruct {
    ComplexStruct {
        id: 12345678901234,
        name: "Bob Smith".to_string(),
        email: "bob.smith@example.com".to_string(),
        scores: vec![95, 87, 92, 88, 91, 89, 94, 90, 93, 86],
        metadata: Metadata {
            created: "2024-01-15T10:30:00Z".to_string(),
            updated: "2024-01-18T14:22:33Z".to_string(),
            tags: vec!["premium".to_string(), "verified".to_string(), "active".to_string()],
            rating: 4.7,
        },
    }
}

fn create_array_data() -> Wrapper<i32> {
    Wrapper { items: (0..1000).collect() }
}

fn create_nested_data() -> Wrapper<ComplexStruct> {
    let items = (0..100)
        .map(|i| ComplexStruct {
            id: i as u64,
            name: format!("User {}", i),
            email: format!("user{}@example.com", i),
            scores: vec![i as i32; 10],
            metadata: Metadata {
                created: "2024-01-15T10:30:00Z".to_string(),
                updated: "2024-01-18T14:22:33Z".to_string(),
                tags: vec!["tag1".to_string(), "tag2".to_string()],
                rating: (i as f64) / 10.0,
            },
        })
        .collect();
    Wrapper { items }
}

fn bench_simple_struct(c: &mut Criterion) {
    let data = create_simple_data();

    let mut group = c.benchmark_group("simple_struct");

    group.bench_function("bson_encode", |b| b.iter(|| serde_bson::to_vec(black_box(&data)).unwrap()));

    group.bench_function("json_encode", |b| b.iter(|| serde_json::to_vec(black_box(&data)).unwrap()));

    let bson_bytes = serde_bson::to_vec(&data).unwrap();
    let json_bytes = serde_json::to_vec(&data).unwrap();

    group.bench_function("bson_decode", |b| {
        b.iter(|| {
            let decoded: SimpleStruct = serde_bson::from_slice(black_box(&bson_bytes)).unwrap();
            decoded
        })
    });

    group.bench_function("json_decode", |b| {
        b.iter(|| {
            let decoded: SimpleStruct = serde_json::from_slice(black_box(&json_bytes)).unwrap();
            decoded
        })
    });

    println!("Simple struct sizes: BSON={} bytes, JSON={} bytes", bson_bytes.len(), json_bytes.len());

    group.finish();
}

fn bench_complex_struct(c: &mut Criterion) {
    let data = create_complex_data();

    let mut group = c.benchmark_group("complex_struct");

    group.bench_function("bson_encode", |b| b.iter(|| serde_bson::to_vec(black_box(&data)).unwrap()));

    group.bench_function("json_encode", |b| b.iter(|| serde_json::to_vec(black_box(&data)).unwrap()));

    let bson_bytes = serde_bson::to_vec(&data).unwrap();
    let json_bytes = serde_json::to_vec(&data).unwrap();

    group.bench_function("bson_decode", |b| {
        b.iter(|| {
            let decoded: ComplexStruct = serde_bson::from_slice(black_box(&bson_bytes)).unwrap();
            decoded
        })
    });

    group.bench_function("json_decode", |b| {
        b.iter(|| {
            let decoded: ComplexStruct = serde_json::from_slice(black_box(&json_bytes)).unwrap();
            decoded
        })
    });

    println!("Complex struct sizes: BSON={} bytes, JSON={} bytes", bson_bytes.len(), json_bytes.len());

    group.finish();
}

fn bench_integer_array(c: &mut Criterion) {
    let data = create_array_data();

    let mut group = c.benchmark_group("integer_array_1000");

    let bson_bytes = serde_bson::to_vec(&data).unwrap();
    let json_bytes = serde_json::to_vec(&data).unwrap();

    group.throughput(Throughput::Elements(data.items.len() as u64));

    group.bench_function("bson_encode", |b| b.iter(|| serde_bson::to_vec(black_box(&data)).unwrap()));

    group.bench_function("json_encode", |b| b.iter(|| serde_json::to_vec(black_box(&data)).unwrap()));

    group.bench_function("bson_decode", |b| {
        b.iter(|| {
            let decoded: Wrapper<i32> = serde_bson::from_slice(black_box(&bson_bytes)).unwrap();
            decoded
        })
    });

    group.bench_function("json_decode", |b| {
        b.iter(|| {
            let decoded: Wrapper<i32> = serde_json::from_slice(black_box(&json_bytes)).unwrap();
            decoded
        })
    });

    println!("Integer array sizes: BSON={} bytes, JSON={} bytes", bson_bytes.len(), json_bytes.len());

    group.finish();
}

fn bench_nested_data(c: &mut Criterion) {
    let data = create_nested_data();

    let mut group = c.benchmark_group("nested_100_objects");

    let bson_bytes = serde_bson::to_vec(&data).unwrap();
    let json_bytes = serde_json::to_vec(&data).unwrap();

    group.throughput(Throughput::Bytes(bson_bytes.len() as u64));

    group.bench_function("bson_encode", |b| b.iter(|| serde_bson::to_vec(black_box(&data)).unwrap()));

    group.bench_function("json_encode", |b| b.iter(|| serde_json::to_vec(black_box(&data)).unwrap()));

    group.bench_function("bson_decode", |b| {
        b.iter(|| {
            let decoded: Wrapper<ComplexStruct> = serde_bson::from_slice(black_box(&bson_bytes)).unwrap();
            decoded
        })
    });

    group.bench_function("json_decode", |b| {
        b.iter(|| {
            let decoded: Wrapper<ComplexStruct> = serde_json::from_slice(black_box(&json_bytes)).unwrap();
            decoded
        })
    });

    // Dynamic model versus typed decoding of the same bytes.
    group.bench_function("bson_decode_document", |b| {
        b.iter(|| decode_document(black_box(&bson_bytes)).unwrap())
    });

    let document = decode_document(&bson_bytes).unwrap();
    group.bench_function("bson_encode_document", |b| {
        b.iter(|| encode_document(black_box(&document)).unwrap())
    });

    println!(
        "Nested data sizes: BSON={} bytes, JSON={} bytes ({:.1}% of JSON)",
        bson_bytes.len(),
        json_bytes.len(),
        (bson_bytes.len() as f64 / json_bytes.len() as f64) * 100.0
    );

    group.finish();
}

fn bench_element_scan(c: &mut Criterion) {
    let bson_bytes = serde_bson::to_vec(&create_complex_data()).unwrap();
    let elements = document_elements(&bson_bytes).unwrap();

    let mut group = c.benchmark_group("element_scan");
    group.throughput(Throughput::Bytes(bson_bytes.len() as u64));

    // Walks element boundaries only; payloads are not decoded.
    group.bench_function("cursor", |b| {
        b.iter(|| ElementCursor::new(black_box(elements)).filter(Result::is_ok).count())
    });

    group.finish();
}

fn bench_stream(c: &mut Criterion) {
    let frame = serde_bson::to_vec(&create_complex_data()).unwrap();
    let stream: Vec<u8> = std::iter::repeat(frame.as_slice()).take(100).flatten().copied().collect();

    let mut group = c.benchmark_group("stream_100_frames");
    group.throughput(Throughput::Bytes(stream.len() as u64));

    group.bench_function("read_frames", |b| {
        b.iter(|| {
            let mut decoder = StreamDecoder::new(Cursor::new(black_box(&stream)));
            let mut frames = 0;
            while decoder.read_frame().is_ok() {
                frames += 1;
            }
            frames
        })
    });

    group.bench_function("decode_documents", |b| {
        b.iter(|| {
            let mut decoder = StreamDecoder::new(Cursor::new(black_box(&stream)));
            decoder.documents().count()
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_simple_struct,
    bench_complex_struct,
    bench_integer_array,
    bench_nested_data,
    bench_element_scan,
    bench_stream,
);

criterion_main!(benches);
