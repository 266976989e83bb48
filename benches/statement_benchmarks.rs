//! Criterion benchmarks for statement synthesis and batch chunking

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sqlbag::bag;
use sqlbag::core::batch::chunk_statements;
use sqlbag::core::projection::{Bag, Projection};
use sqlbag::core::statement::{insert, upsert, Dialect};
use sqlbag::core::Interceptors;

fn sample_bag(fields: usize) -> Bag {
    let mut bag = Bag::new();
    for i in 0..fields {
        bag.insert(format!("Column{i}"), i as i64);
    }
    bag
}

// ============================================================================
// Projection Benchmarks
// ============================================================================

fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection");
    for fields in [4usize, 16, 64] {
        let bag = sample_bag(fields);
        group.throughput(Throughput::Elements(fields as u64));
        group.bench_with_input(BenchmarkId::from_parameter(fields), &bag, |b, bag| {
            b.iter(|| {
                let projection = Projection::from_source(black_box(bag), None);
                black_box(projection)
            });
        });
    }
    group.finish();
}

// ============================================================================
// Statement Synthesis Benchmarks
// ============================================================================

fn bench_statement_synthesis(c: &mut Criterion) {
    let interceptors = Interceptors::new();
    let values = bag! { "Name" => "Anne", "Age" => 31, "City" => "Lyon", "Active" => true };

    let mut group = c.benchmark_group("statement_synthesis");
    group.throughput(Throughput::Elements(1));

    group.bench_function("insert", |b| {
        b.iter(|| {
            let statement = insert("Users", black_box(&values), None, &interceptors).unwrap();
            black_box(statement)
        });
    });

    group.bench_function("upsert_mysql", |b| {
        b.iter(|| {
            let statement =
                upsert(Dialect::Mysql, "Users", black_box(&values), None, &interceptors).unwrap();
            black_box(statement)
        });
    });

    group.bench_function("upsert_sqlite", |b| {
        b.iter(|| {
            let statement =
                upsert(Dialect::Sqlite, "Users", black_box(&values), None, &interceptors).unwrap();
            black_box(statement)
        });
    });

    group.finish();
}

// ============================================================================
// Batch Chunking Benchmarks
// ============================================================================

fn bench_batch_chunking(c: &mut Criterion) {
    let interceptors = Interceptors::new();
    let mut group = c.benchmark_group("batch_chunking");

    for rows in [10usize, 100, 500] {
        let members: Vec<Projection> = (0..rows)
            .map(|i| {
                let mut bag = sample_bag(6);
                if i % 3 == 0 {
                    bag.insert("Extra", "sometimes");
                }
                Projection::from_source(&bag, None)
            })
            .collect();

        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(
            BenchmarkId::new("mysql", rows),
            &members,
            |b, members| {
                b.iter(|| {
                    let statements =
                        chunk_statements(Dialect::Mysql, "T", black_box(members), &interceptors)
                            .unwrap();
                    black_box(statements)
                });
            },
        );
        group.bench_with_input(
            BenchmarkId::new("sqlite", rows),
            &members,
            |b, members| {
                b.iter(|| {
                    let statements =
                        chunk_statements(Dialect::Sqlite, "T", black_box(members), &interceptors)
                            .unwrap();
                    black_box(statements)
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_projection,
    bench_statement_synthesis,
    bench_batch_chunking
);
criterion_main!(benches);
