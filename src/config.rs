use crate::debug;
use crate::error::{PoolError, PoolResult};
use serde::{Deserialize, Serialize};

/// Per-block metadata kept directly in front of each object.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderScheme {
    /// No header bytes at all.
    None,
    /// An allocation number and an in-use flag.
    Basic,
    /// `user_bytes` of caller reserved space, a use counter, an allocation
    /// number and an in-use flag.
    Extended { user_bytes: usize },
    /// A key into an out-of-line record holding the in-use flag, the
    /// allocation number and the owner's label.
    External,
}

/// Where pages come from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryBackend {
    /// Rust's global allocator.
    Native,
    /// The C heap (`malloc`/`free`).
    Raw,
}

/// This structure contains the configuration settings for a pool.
///
/// Everything except `debug` is fixed once the pool is built.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// How many objects every page is carved into.
    pub objects_per_page: usize,
    /// The most pages the pool may ever hold.
    pub max_pages: usize,
    /// Bytes reserved after the page's identification slot, before the
    /// first block.
    pub left_align_bytes: usize,
    /// Bytes reserved between two neighbouring blocks.
    pub inter_align_bytes: usize,
    /// Size of the guard zone written on each side of every object.
    pub pad_bytes: usize,
    pub header: HeaderScheme,
    pub backend: MemoryBackend,
    /// Turns on per operation instrumentation. Guard and fill patterns are
    /// written regardless of this flag.
    pub debug: bool,
}

pub const POOL_CONFIG_DEFAULT_OBJECTS_PER_PAGE: usize = 4;
pub const POOL_CONFIG_DEFAULT_MAX_PAGES: usize = 3;
pub const POOL_CONFIG_DEFAULT_PAD_BYTES: usize = 0;

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            objects_per_page: POOL_CONFIG_DEFAULT_OBJECTS_PER_PAGE,
            max_pages: POOL_CONFIG_DEFAULT_MAX_PAGES,
            left_align_bytes: 0,
            inter_align_bytes: 0,
            pad_bytes: POOL_CONFIG_DEFAULT_PAD_BYTES,
            header: HeaderScheme::None,
            backend: MemoryBackend::Native,
            debug: debug::debug_from_env(),
        }
    }
}

impl PoolConfig {
    /// Reads a configuration from TOML. Missing fields keep their defaults.
    ///
    /// ```toml
    /// objects_per_page = 8
    /// max_pages = 2
    /// pad_bytes = 4
    /// header = { extended = { user_bytes = 2 } }
    /// backend = "raw"
    /// ```
    pub fn from_toml_str(source: &str) -> PoolResult<Self> {
        toml::from_str(source).map_err(|e| PoolError::ConfigParse(e.to_string()))
    }

    pub fn with_objects_per_page(mut self, objects_per_page: usize) -> Self {
        self.objects_per_page = objects_per_page;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_alignment(mut self, left_align_bytes: usize, inter_align_bytes: usize) -> Self {
        self.left_align_bytes = left_align_bytes;
        self.inter_align_bytes = inter_align_bytes;
        self
    }

    pub fn with_pad_bytes(mut self, pad_bytes: usize) -> Self {
        self.pad_bytes = pad_bytes;
        self
    }

    pub fn with_header(mut self, header: HeaderScheme) -> Self {
        self.header = header;
        self
    }

    pub fn with_backend(mut self, backend: MemoryBackend) -> Self {
        self.backend = backend;
        self
    }

    pub(crate) fn validate(&self) -> PoolResult<()> {
        if self.objects_per_page == 0 {
            return Err(PoolError::InvalidConfig("objects_per_page must be at least 1"));
        }

        if self.max_pages == 0 {
            return Err(PoolError::InvalidConfig("max_pages must be at least 1"));
        }

        Ok(())
    }
}
