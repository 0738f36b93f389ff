//! 存储模块
//!
//! 缓存存储与配置存储的契约及进程内实现。

pub mod cache;
pub mod config_store;

pub use cache::{
    generate_cache_key, normalize_source_text, summarize, CacheEntry, CacheStats, CacheStore,
    CacheSummary, MemoryCacheStore,
};
pub use config_store::{ConfigListener, ConfigStore, MemoryConfigStore};
