use criterion::{
    criterion_group,
    criterion_main,
    Criterion,
};

use pagepool::{HeaderScheme, PoolAllocator, PoolConfig};

fn alloc_and_free(c: &mut Criterion) {
    let config = PoolConfig::default()
        .with_objects_per_page(1024)
        .with_max_pages(16);
    let mut pool = PoolAllocator::new(64, config).unwrap();

    c.bench_function("alloc free 64B", |b| {
        b.iter(|| {
            let ptr = pool.allocate("bench").unwrap();
            pool.free(ptr.as_ptr()).unwrap();
        });
    });

    let guarded = config
        .with_pad_bytes(16)
        .with_header(HeaderScheme::Extended { user_bytes: 8 });
    let mut pool = PoolAllocator::new(64, guarded).unwrap();

    c.bench_function("alloc free 64B guarded", |b| {
        b.iter(|| {
            let ptr = pool.allocate("bench").unwrap();
            pool.free(ptr.as_ptr()).unwrap();
        });
    });
}

fn fill_pool(c: &mut Criterion) {
    let config = PoolConfig::default()
        .with_objects_per_page(256)
        .with_max_pages(8)
        .with_header(HeaderScheme::External);

    c.bench_function("fill 2048 external", |b| {
        b.iter(|| {
            let mut pool = PoolAllocator::new(32, config).unwrap();

            for _ in 0..2048 {
                pool.allocate("node").unwrap();
            }
        });
    });
}

criterion_group!(benches, alloc_and_free, fill_pool);
criterion_main!(benches);
