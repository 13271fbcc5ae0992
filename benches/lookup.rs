// ABOUTME: Benchmark comparing a lazy single-field lookup against decoding every field.
// ABOUTME: Documents are assembled in memory so the numbers are reproducible.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lazy_bson::Document;

/// Build `{"f0": "value 0", "f1": 1, "f2": "value 2", ...}` with `count` fields.
fn build_document(count: usize) -> Vec<u8> {
    let mut body = Vec::new();
    for i in 0..count {
        let key = format!("f{i}");
        if i % 2 == 0 {
            let text = format!("value {i}");
            body.push(0x02);
            body.extend_from_slice(key.as_bytes());
            body.push(0);
            body.extend_from_slice(&((text.len() + 1) as i32).to_le_bytes());
            body.extend_from_slice(text.as_bytes());
            body.push(0);
        } else {
            body.push(0x10);
            body.extend_from_slice(key.as_bytes());
            body.push(0);
            body.extend_from_slice(&(i as i32).to_le_bytes());
        }
    }

    let mut doc = ((body.len() + 5) as i32).to_le_bytes().to_vec();
    doc.extend_from_slice(&body);
    doc.push(0);
    doc
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");

    for count in [10, 100, 1000] {
        let bytes = build_document(count);
        let last = format!("f{}", count - 1);
        group.throughput(Throughput::Bytes(bytes.len() as u64));

        group.bench_with_input(BenchmarkId::new("single_field", count), &bytes, |b, bytes| {
            b.iter(|| {
                let doc = Document::from_slice(black_box(bytes)).unwrap();
                black_box(doc.get(&last).unwrap().clone())
            });
        });

        group.bench_with_input(BenchmarkId::new("every_field", count), &bytes, |b, bytes| {
            b.iter(|| {
                let doc = Document::from_slice(black_box(bytes)).unwrap();
                for entry in doc.iter() {
                    black_box(entry.unwrap());
                }
            });
        });
    }

    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let bytes = build_document(1000);
    c.bench_function("validate_only", |b| {
        b.iter(|| Document::from_slice(black_box(&bytes)).unwrap());
    });
}

criterion_group!(benches, bench_lookup, bench_validate);
criterion_main!(benches);
