use pagepool::{
    BlockHeader, ExternalRecord, FreeFault, HeaderScheme, MemoryBackend, PoolAllocator,
    PoolConfig, PoolError,
};
use std::ptr::NonNull;

#[test]
fn allocate_and_free_one_object() {
    let mut pool = PoolAllocator::new(64, PoolConfig::default()).unwrap();
    let ptr = pool.allocate("one").unwrap();

    unsafe { ptr.as_ptr().write_bytes(7, 64) };

    pool.free(ptr.as_ptr()).unwrap();

    let stats = pool.stats();
    assert_eq!(stats.allocations, 1);
    assert_eq!(stats.deallocations, 1);
    assert_eq!(stats.objects_in_use, 0);
    assert_eq!(stats.most_objects, 1);
}

#[test]
fn pool_from_toml() {
    let config = PoolConfig::from_toml_str(
        r#"
        objects_per_page = 2
        max_pages = 5
        pad_bytes = 8
        header = "external"
        backend = "raw"
        "#,
    )
    .unwrap();
    let mut pool = PoolAllocator::new(16, config).unwrap();
    let ptrs: Vec<NonNull<u8>> = (0..10)
        .map(|i| pool.allocate(&format!("owner {i}")).unwrap())
        .collect();

    assert_eq!(pool.stats().pages_in_use, 5);
    assert_eq!(pool.page_list().count(), 5);
    assert!(matches!(
        pool.allocate("one too many"),
        Err(PoolError::PageLimitExceeded { max_pages: 5 })
    ));

    let record = pool.external_info(ptrs[3].as_ptr()).unwrap();
    assert_eq!(record.label.as_deref(), Some("owner 3"));
    assert_eq!(record.alloc_num, 4);
}

#[test]
fn every_header_scheme_survives_reuse() {
    let schemes = [
        HeaderScheme::None,
        HeaderScheme::Basic,
        HeaderScheme::Extended { user_bytes: 0 },
        HeaderScheme::Extended { user_bytes: 9 },
        HeaderScheme::External,
    ];

    for header in schemes {
        for backend in [MemoryBackend::Native, MemoryBackend::Raw] {
            let config = PoolConfig::default()
                .with_header(header)
                .with_backend(backend)
                .with_pad_bytes(3)
                .with_alignment(1, 5);
            let mut pool = PoolAllocator::new(12, config).unwrap();

            for _ in 0..3 {
                let ptrs: Vec<NonNull<u8>> =
                    (0..12).map(|_| pool.allocate("cycle").unwrap()).collect();

                for ptr in ptrs {
                    pool.free(ptr.as_ptr()).unwrap();
                }
            }

            let stats = pool.stats();
            assert_eq!(stats.allocations, 36);
            assert_eq!(stats.pages_in_use, 3);
            assert_eq!(pool.validate_pages(|_, _| {}), 0, "{header:?} {backend:?}");
        }
    }
}

#[test]
fn freed_external_block_keeps_its_record() {
    let config = PoolConfig::default().with_header(HeaderScheme::External);
    let mut pool = PoolAllocator::new(8, config).unwrap();
    let ptr = pool.allocate("tree node").unwrap();

    pool.free(ptr.as_ptr()).unwrap();

    assert_eq!(
        pool.header_info(ptr.as_ptr()),
        Some(BlockHeader::External(Some(ExternalRecord {
            in_use: false,
            alloc_num: 1,
            label: None,
        })))
    );
}

#[test]
fn double_free_is_refused() {
    let mut pool = PoolAllocator::new(8, PoolConfig::default()).unwrap();
    let a = pool.allocate("a").unwrap();
    let _b = pool.allocate("b").unwrap();

    pool.free(a.as_ptr()).unwrap();

    let err = pool.free(a.as_ptr()).unwrap_err();

    assert_eq!(err, PoolError::InvalidFree(FreeFault::NotAllocated));
    assert_eq!(err.to_string(), "invalid free: block is not allocated");
}

#[test]
fn stats_serialize() {
    let pool = PoolAllocator::new(8, PoolConfig::default()).unwrap();
    let stats = toml::to_string(&pool.stats()).unwrap();

    assert!(stats.contains("pages_in_use = 1"));
    assert!(stats.contains("free_objects = 4"));
}
