// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Identifier codec benchmarks: encoding selection + bit packing, plus the
// memoized per-kind entry points that the schema encoder actually hits.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use metadef::metastring::{encoders, MetaStringDecoder, MetaStringEncoder};

const IDENTIFIERS: &[&str] = &[
    "timestamp",
    "sensorValue",
    "SensorReading",
    "org.example.telemetry",
    "attribute_map_2",
];

fn bench_encode(c: &mut Criterion) {
    let encoder = MetaStringEncoder::new('.', '_');
    c.bench_function("metastring_encode_adaptive", |b| {
        b.iter(|| {
            for input in IDENTIFIERS {
                black_box(encoder.encode(black_box(input)).unwrap());
            }
        });
    });
}

fn bench_decode(c: &mut Criterion) {
    let encoder = MetaStringEncoder::new('.', '_');
    let decoder = MetaStringDecoder::new('.', '_');
    let encoded: Vec<_> = IDENTIFIERS
        .iter()
        .map(|s| encoder.encode(s).unwrap())
        .collect();
    c.bench_function("metastring_decode", |b| {
        b.iter(|| {
            for ms in &encoded {
                black_box(decoder.decode(black_box(ms.bytes()), ms.encoding()).unwrap());
            }
        });
    });
}

fn bench_cached_field_names(c: &mut Criterion) {
    c.bench_function("metastring_encode_field_cached", |b| {
        b.iter(|| {
            for input in IDENTIFIERS {
                black_box(encoders::encode_field_name(black_box(input)).unwrap());
            }
        });
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_cached_field_names);
criterion_main!(benches);
