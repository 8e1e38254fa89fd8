use serde::Serialize;

/// A 'snapshot' of the pool's counters.
///
/// Obtained by calling [`crate::PoolAllocator::stats`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Size of a single object as requested at construction.
    pub object_size: usize,

    /// Object size plus both guard zones plus the header.
    pub block_size: usize,

    /// Bytes requested from the backend for every page.
    pub page_size: usize,

    /// Total number of successful allocations.
    pub allocations: u64,

    /// Total number of successful frees.
    pub deallocations: u64,

    pub objects_in_use: usize,
    pub pages_in_use: usize,
    pub free_objects: usize,

    /// The highest `objects_in_use` ever observed.
    pub most_objects: usize,
}

impl PoolStats {
    pub(crate) fn new(object_size: usize, block_size: usize, page_size: usize) -> Self {
        Self {
            object_size,
            block_size,
            page_size,
            ..Self::default()
        }
    }

    pub(crate) fn record_page(&mut self, objects_per_page: usize) {
        self.pages_in_use += 1;
        self.free_objects += objects_per_page;
    }

    pub(crate) fn record_alloc(&mut self) {
        self.allocations += 1;
        self.objects_in_use += 1;
        self.free_objects -= 1;
        self.most_objects = self.most_objects.max(self.objects_in_use);
    }

    pub(crate) fn record_free(&mut self) {
        self.deallocations += 1;
        self.objects_in_use -= 1;
        self.free_objects += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_survives_frees() {
        let mut stats = PoolStats::new(8, 8, 40);

        stats.record_page(4);
        stats.record_alloc();
        stats.record_alloc();
        stats.record_free();
        stats.record_alloc();

        assert_eq!(stats.most_objects, 2);
        assert_eq!(stats.objects_in_use, 2);
        assert_eq!(stats.free_objects, 2);
        assert_eq!(stats.allocations - stats.deallocations, 2);
    }
}
