//! Benchmarks for array mutation and lazy mapping.
//!
//! Run with: cargo bench -p sectioned-store

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use sectioned_core::{ArraySection, DataSource, IndexPath};
use sectioned_store::{ArrayDataSource, MappingDataSource};
use std::hint::black_box;

/// Source with `sections` sections of `per_section` objects each.
fn make_source(sections: usize, per_section: usize) -> ArrayDataSource<u64> {
    let source = ArrayDataSource::new();
    source.set_sections(
        (0..sections)
            .map(|s| {
                let start = (s * per_section) as u64;
                ArraySection::new((start..start + per_section as u64).collect())
            })
            .collect(),
    );
    source
}

fn read_all<S: DataSource>(source: &S) -> usize {
    let mut seen = 0;
    for section in 0..source.sections_count() {
        for item in 0..source.number_of_objects(section) {
            black_box(source.object_at(IndexPath::new(section, item)));
            seen += 1;
        }
    }
    seen
}

fn bench_mapping_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("mapping/read");

    for n in [100, 1_000, 10_000] {
        let source = make_source(10, n / 10);
        group.bench_with_input(BenchmarkId::new("cold", n), &source, |b, source| {
            b.iter(|| {
                let mapping = MappingDataSource::new(source, |v: u64| v.to_string());
                black_box(read_all(&mapping))
            })
        });

        let warm = MappingDataSource::new(&source, |v: u64| v.to_string());
        read_all(&warm);
        group.bench_with_input(BenchmarkId::new("warm", n), &warm, |b, warm| {
            b.iter(|| black_box(read_all(warm)))
        });
    }

    group.finish();
}

fn bench_array_mutation(c: &mut Criterion) {
    let mut group = c.benchmark_group("array/mutation");

    for n in [100, 1_000] {
        group.bench_function(BenchmarkId::new("append_batched", n), |b| {
            b.iter(|| {
                let source = ArrayDataSource::<u64>::new();
                source.apply(false, |source| {
                    for v in 0..n {
                        source.append(v);
                    }
                });
                black_box(source.number_of_objects(0))
            })
        });

        group.bench_function(BenchmarkId::new("append_observed_by_mapping", n), |b| {
            b.iter(|| {
                let source = ArrayDataSource::<u64>::new();
                let mapping = MappingDataSource::new(&source, |v: u64| v * 2);
                black_box(mapping.sections_count());
                for v in 0..n {
                    source.append(v);
                }
                black_box(mapping.number_of_objects(0))
            })
        });
    }

    group.finish();
}

fn bench_cache_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("mapping/churn");

    for n in [1_000, 10_000] {
        let source = make_source(1, n);
        let mapping = MappingDataSource::new(&source, |v: u64| v.wrapping_mul(31));
        read_all(&mapping);
        group.bench_with_input(
            BenchmarkId::new("front_insert_remove", n),
            &mapping,
            |b, mapping| {
                b.iter(|| {
                    source.insert(0, IndexPath::new(0, 0));
                    black_box(mapping.object_at(IndexPath::new(0, 1)));
                    source.remove(IndexPath::new(0, 0));
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_mapping_reads,
    bench_array_mutation,
    bench_cache_churn,
);
criterion_main!(benches);
