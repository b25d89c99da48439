//! Benchmarks for MemoryDriver remove and sort operations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tabula_core::{Row, Value};
use tabula_storage::{MemoryDriver, SortableDriver, WritableDriver};

fn populate_driver(count: u64) -> MemoryDriver {
    let sectors = ["Tech", "Finance", "Health", "Energy", "Consumer"];
    let mut driver = MemoryDriver::new();
    for i in 0..count {
        driver
            .add(Row::from_values(vec![
                Value::Int64(i as i64),
                Value::Float64(100.0 + ((i * 7919) % 1000) as f64 * 0.1),
                Value::String(format!("SYM{}", i)),
                Value::String(sectors[(i as usize) % sectors.len()].into()),
            ]))
            .unwrap();
    }
    driver
}

/// Benchmark: removing rows from the front vs the back of the order.
fn memory_driver_remove_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_driver_remove");
    let total_rows = 50_000u64;

    for remove_count in [100u64, 1000, 10000].iter() {
        group.bench_with_input(
            BenchmarkId::new("front", remove_count),
            remove_count,
            |b, &remove_count| {
                b.iter_batched(
                    || populate_driver(total_rows),
                    |mut driver| {
                        for key in 0..remove_count {
                            let _ = driver.remove(key);
                        }
                        black_box(driver)
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );

        group.bench_with_input(
            BenchmarkId::new("back", remove_count),
            remove_count,
            |b, &remove_count| {
                b.iter_batched(
                    || populate_driver(total_rows),
                    |mut driver| {
                        for key in (total_rows - remove_count)..total_rows {
                            let _ = driver.remove(key);
                        }
                        black_box(driver)
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

/// Benchmark: physical sort by a float column.
fn memory_driver_sort_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_driver_sort");

    for total_rows in [1000u64, 10000, 50000].iter() {
        group.bench_with_input(
            BenchmarkId::new("by_price", total_rows),
            total_rows,
            |b, &total_rows| {
                b.iter_batched(
                    || populate_driver(total_rows),
                    |mut driver| {
                        driver
                            .sort_by(&mut |a: &Row, b: &Row| a.get(1).cmp(&b.get(1)))
                            .unwrap();
                        black_box(driver)
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    memory_driver_remove_benchmark,
    memory_driver_sort_benchmark,
);

criterion_main!(benches);
