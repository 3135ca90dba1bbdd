//! Benchmarks for hyperkv storage operations

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use hyperkv::{keys, Config, KvStore, MemoryStore, Node, Storage, StorageSource};
use tempfile::TempDir;

fn memory_storage(config: Config) -> Storage {
    let source = StorageSource::factory(|_| Ok(Arc::new(MemoryStore::new()) as Arc<dyn KvStore>));
    let storage = Storage::new(source, config).unwrap();
    storage.open().unwrap();
    storage
}

fn key_benchmarks(c: &mut Criterion) {
    c.bench_function("keys/encode", |b| {
        let mut n = 0u64;
        b.iter(|| {
            n = n.wrapping_add(7919);
            black_box(keys::encode(n))
        })
    });
}

fn node_benchmarks(c: &mut Criterion) {
    let storage = memory_storage(Config::default());
    let node = Node::new(0, [0x5A; 32], 4096);

    c.bench_function("tree/put_node", |b| {
        let mut index = 0u64;
        b.iter(|| {
            index += 1;
            storage.put_node(index, &node).unwrap();
        })
    });

    for i in 0..10_000u64 {
        storage.put_node(i, &Node::new(i, [1; 32], i)).unwrap();
    }

    let uncached = memory_storage(Config::builder().tree_cache(None).build());
    for i in 0..10_000u64 {
        uncached.put_node(i, &Node::new(i, [1; 32], i)).unwrap();
    }

    c.bench_function("tree/get_node_cached", |b| {
        let mut index = 0u64;
        b.iter(|| {
            index = (index + 1) % 10_000;
            black_box(storage.get_node(index).unwrap())
        })
    });

    c.bench_function("tree/get_node_uncached", |b| {
        let mut index = 0u64;
        b.iter(|| {
            index = (index + 1) % 10_000;
            black_box(uncached.get_node(index).unwrap())
        })
    });
}

fn data_benchmarks(c: &mut Criterion) {
    let storage = memory_storage(Config::default());
    let block = vec![0xA5u8; 1024];

    c.bench_function("data/put_data_1k", |b| {
        let mut index = 0u64;
        b.iter(|| {
            index += 1;
            storage.put_data(index, block.clone()).unwrap();
        })
    });

    c.bench_function("data/put_data_batch_64x1k", |b| {
        let mut index = 0u64;
        b.iter_batched(
            || vec![block.clone(); 64],
            |blocks| {
                index += 64;
                storage.put_data_batch(index, blocks).unwrap();
            },
            BatchSize::SmallInput,
        )
    });
}

fn path_benchmarks(c: &mut Criterion) {
    let temp = TempDir::new().unwrap();
    let source = StorageSource::path(temp.path().join("bench"));
    let storage = Storage::new(source, Config::default()).unwrap();
    storage.open().unwrap();
    let signature = vec![0x11u8; 64];

    c.bench_function("path/put_signature", |b| {
        let mut index = 0u64;
        b.iter(|| {
            index += 1;
            storage.put_signature(index, signature.clone()).unwrap();
        })
    });

    storage.close().unwrap();
}

criterion_group!(benches, key_benchmarks, node_benchmarks, data_benchmarks, path_benchmarks);
criterion_main!(benches);
