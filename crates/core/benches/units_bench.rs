//! 단위 파싱/변환 벤치마크
//!
//! 접두어 재시도 경로와 비율 단위를 포함한 파싱 비용을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use ironmetric_core::units::{Prefix, Unit, get_unit_prefix_factor};

fn bench_parse(c: &mut Criterion) {
    let inputs = [
        ("simple", "B"),
        ("prefixed", "MBytes"),
        ("binary_rate", "KiB/s"),
        ("retry_packets", "packets"),
        ("temperature", "°C"),
        ("invalid", "volt"),
    ];

    let mut group = c.benchmark_group("unit_parse");
    group.throughput(Throughput::Elements(1));
    for (label, raw) in inputs {
        group.bench_with_input(BenchmarkId::from_parameter(label), raw, |b, raw| {
            b.iter(|| Unit::parse(black_box(raw)))
        });
    }
    group.finish();
}

fn bench_conversion(c: &mut Criterion) {
    let input = Unit::parse("Byte");
    let output = input.with_prefix(Prefix::Mega);

    let mut group = c.benchmark_group("unit_conversion");
    group.throughput(Throughput::Elements(1));
    group.bench_function("bytes_to_megabytes", |b| {
        b.iter(|| {
            get_unit_prefix_factor(black_box(&input), black_box(&output))
                .map(|conv| conv.apply(black_box(1024.0)))
        })
    });
    group.bench_function("parse_and_normalize", |b| {
        b.iter(|| Unit::parse(black_box("mbytes/sec")).short())
    });
    group.finish();
}

criterion_group!(benches, bench_parse, bench_conversion);
criterion_main!(benches);
