use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kinship_core::{ClosureStore, MemoryClosureStore, SqliteClosureStore, VertexId};

/// Layer sizes for the synthetic hierarchies: `layers` levels of `width`
/// groups, each group a subgroup of two groups in the level above.
const SHAPES: &[(&str, i64, i64)] = &[("small", 4, 4), ("medium", 6, 8), ("wide", 4, 16)];

fn layered_edges(layers: i64, width: i64) -> Vec<(VertexId, VertexId)> {
    let mut edges = Vec::new();
    for layer in 1..layers {
        for i in 0..width {
            let child = VertexId::new(layer * width + i);
            let above = (layer - 1) * width;
            edges.push((VertexId::new(above + i), child));
            edges.push((VertexId::new(above + (i + 1) % width), child));
        }
    }
    edges
}

fn build<S: ClosureStore>(mut store: S, edges: &[(VertexId, VertexId)]) -> S {
    for &(parent, child) in edges {
        let _ = store.add_edge(parent, child);
    }
    store
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("closure.insert");

    for &(name, layers, width) in SHAPES {
        let edges = layered_edges(layers, width);
        group.throughput(Throughput::Elements(edges.len() as u64));

        group.bench_with_input(BenchmarkId::new("memory", name), &edges, |b, edges| {
            b.iter(|| black_box(build(MemoryClosureStore::new(), edges).len()));
        });

        group.bench_with_input(BenchmarkId::new("sqlite", name), &edges, |b, edges| {
            b.iter_batched(
                || SqliteClosureStore::open_in_memory().expect("open sqlite store"),
                |store| black_box(build(store, edges)),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("closure.remove");

    for &(name, layers, width) in SHAPES {
        let edges = layered_edges(layers, width);
        // Cutting an edge near the top retracts the most derived rows.
        let (parent, child) = edges[0];
        let built = build(MemoryClosureStore::new(), &edges);

        group.bench_with_input(BenchmarkId::new("memory", name), &built, |b, built| {
            b.iter_batched(
                || built.clone(),
                |mut store| black_box(store.retract_edge(parent, child)),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("closure.query");

    for &(name, layers, width) in SHAPES {
        let edges = layered_edges(layers, width);
        let memory = build(MemoryClosureStore::new(), &edges);
        let sqlite = build(
            SqliteClosureStore::open_in_memory().expect("open sqlite store"),
            &edges,
        );
        let root = VertexId::new(0);

        group.bench_function(BenchmarkId::new("memory.descendants", name), |b| {
            b.iter(|| black_box(memory.descendants(root)));
        });
        group.bench_function(BenchmarkId::new("sqlite.descendants", name), |b| {
            b.iter(|| black_box(sqlite.descendants(root).expect("query")));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_insert, bench_remove, bench_query);
criterion_main!(benches);
