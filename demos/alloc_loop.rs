use pagepool::{HeaderScheme, PoolAllocator, PoolConfig, PoolError};
use std::ptr::NonNull;

fn main() {
    let config = PoolConfig::default()
        .with_objects_per_page(64)
        .with_max_pages(4)
        .with_pad_bytes(8)
        .with_header(HeaderScheme::Basic);
    let mut pool = PoolAllocator::new(48, config).unwrap();
    let mut live: Vec<NonNull<u8>> = vec![];

    for round in 0..100 {
        loop {
            match pool.allocate("loop") {
                Ok(ptr) => live.push(ptr),
                Err(PoolError::PageLimitExceeded { .. }) => break,
                Err(err) => panic!("{err}"),
            }
        }

        // hand back every other object so the next round refills the holes
        for ptr in live.iter().skip(round % 2).step_by(2) {
            pool.free(ptr.as_ptr()).unwrap();
        }
        live = live.into_iter().skip(1 - round % 2).step_by(2).collect();

        let stats = pool.stats();
        let pool_kb = (stats.pages_in_use * stats.page_size) as f64 / 1024.0;

        assert_eq!(pool.validate_pages(|_, _| {}), 0);
        println!("Pool KB: {:.2}", pool_kb);
        println!("In use: {} / peak {}", stats.objects_in_use, stats.most_objects);
    }
}
