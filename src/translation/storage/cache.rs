//! 翻译缓存模块
//!
//! `CacheStore` 是外部键值存储的最小契约，`MemoryCacheStore` 是进程内实现。

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::translation::config::constants::CACHE_KEY_PREFIX;

// ============================================================================
// 核心类型
// ============================================================================

/// 缓存条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub original_text: String,
    pub translated_text: String,
    pub source_lang: String,
    pub target_lang: String,
    pub detected_lang: Option<String>,
    pub tokens_used: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// 创建新的缓存条目
    pub fn new(
        original_text: String,
        translated_text: String,
        source_lang: String,
        target_lang: String,
    ) -> Self {
        Self {
            original_text,
            translated_text,
            source_lang,
            target_lang,
            detected_lang: None,
            tokens_used: 0,
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    /// 设置过期时间
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| self.created_at.checked_add_signed(ttl));
        self
    }

    /// 检查条目是否过期
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires| Utc::now() >= expires)
    }
}

/// 外部缓存存储契约
pub trait CacheStore {
    fn get(&self, key: &str) -> Option<CacheEntry>;
    fn set(&self, key: &str, entry: CacheEntry);
    /// 删除所有以 `prefix` 开头的键，返回删除数量
    fn delete_by_prefix(&self, prefix: &str) -> usize;
    /// 枚举全部未过期条目
    fn entries(&self) -> Vec<(String, CacheEntry)>;
}

/// 缓存统计信息
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheStats {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_entries: usize,
    pub evictions: u64,
}

impl CacheStats {
    /// 计算缓存命中率
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_requests as f64
        }
    }
}

/// 进程内缓存存储
#[derive(Clone)]
pub struct MemoryCacheStore {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    max_entries: Option<usize>,
    stats: Arc<RwLock<CacheStats>>,
}

// ============================================================================
// 实现
// ============================================================================

impl MemoryCacheStore {
    /// 创建不限容量的缓存
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries: None,
            stats: Arc::new(RwLock::new(CacheStats::default())),
        }
    }

    /// 创建限定容量的缓存，满时驱逐最早创建的条目
    pub fn with_capacity_limit(max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries.max(1)),
            ..Self::new()
        }
    }

    // 锁中毒只意味着另一个持锁线程 panic 过，数据本身仍然可用
    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    fn write_stats(&self) -> RwLockWriteGuard<'_, CacheStats> {
        self.stats.write().unwrap_or_else(|e| e.into_inner())
    }

    /// 清理过期条目
    pub fn cleanup_expired(&self) -> usize {
        let mut entries = self.write_entries();
        let initial_size = entries.len();

        entries.retain(|_, entry| !entry.is_expired());

        let removed = initial_size - entries.len();
        let mut stats = self.write_stats();
        stats.total_entries = entries.len();
        stats.evictions += removed as u64;

        removed
    }

    /// 获取统计信息
    pub fn get_stats(&self) -> CacheStats {
        let mut result = self.stats.read().unwrap_or_else(|e| e.into_inner()).clone();
        result.total_entries = self.read_entries().len();
        result
    }

    /// 获取缓存大小
    pub fn size(&self) -> usize {
        self.read_entries().len()
    }

    fn evict_oldest(&self, entries: &mut HashMap<String, CacheEntry>) {
        let oldest_key = entries
            .iter()
            .min_by_key(|(_, entry)| entry.created_at)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest_key {
            entries.remove(&key);
            self.write_stats().evictions += 1;
        }
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let mut entries = self.write_entries();
        let mut stats = self.write_stats();
        stats.total_requests += 1;

        match entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                stats.cache_hits += 1;
                return Some(entry.clone());
            }
            Some(_) => {
                // 删除过期条目
                entries.remove(key);
                stats.evictions += 1;
            }
            None => {}
        }

        stats.cache_misses += 1;
        None
    }

    fn set(&self, key: &str, entry: CacheEntry) {
        let mut entries = self.write_entries();

        if let Some(max) = self.max_entries {
            if !entries.contains_key(key) && entries.len() >= max {
                self.evict_oldest(&mut entries);
            }
        }

        entries.insert(key.to_string(), entry);
        self.write_stats().total_entries = entries.len();
    }

    fn delete_by_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.write_entries();
        let initial_size = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = initial_size - entries.len();
        self.write_stats().total_entries = entries.len();
        removed
    }

    fn entries(&self) -> Vec<(String, CacheEntry)> {
        self.read_entries()
            .iter()
            .filter(|(_, entry)| !entry.is_expired())
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }
}

// ============================================================================
// 实用函数
// ============================================================================

/// 规范化源文本：去掉首尾空白并合并连续空白
pub fn normalize_source_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 生成缓存键，只依赖规范化文本和目标语言
pub fn generate_cache_key(text: &str, target_lang: &str) -> String {
    let normalized = normalize_source_text(text);
    let digest = blake3::hash(normalized.as_bytes());
    format!(
        "{}{}:{}",
        CACHE_KEY_PREFIX,
        target_lang.trim().to_lowercase(),
        &digest.to_hex()[..32]
    )
}

/// 按存储内容汇总的缓存概况
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheSummary {
    pub entries: usize,
    pub total_tokens: u64,
    pub by_target_lang: HashMap<String, usize>,
}

/// 枚举存储生成概况
pub fn summarize<S: CacheStore + ?Sized>(store: &S) -> CacheSummary {
    let mut summary = CacheSummary::default();
    for (key, entry) in store.entries() {
        if !key.starts_with(CACHE_KEY_PREFIX) {
            continue;
        }
        summary.entries += 1;
        summary.total_tokens += u64::from(entry.tokens_used);
        *summary.by_target_lang.entry(entry.target_lang.clone()).or_insert(0) += 1;
    }
    summary
}
