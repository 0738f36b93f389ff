//! 已处理集合
//!
//! 两层记录：
//!
//! - DOM 标记：在容器上写入 `data-ft-processed` 与 `data-ft-post-id`，脚本重新注入、
//!   内存集合被重置后依然有效，是判定的权威来源
//! - 内存集合：按插入顺序保存帖子标识，超过上限时先进先出淘汰
//!
//! 内存集合使用 `LruCache` 的无界模式，只调用 `contains`/`peek`，不调用 `get`，
//! 因此最近最少使用的顺序就是插入顺序。

use lru::LruCache;
use markup5ever_rcdom::Handle;

use crate::dom::{find_descendants, get_node_attr, is_attached, is_element, set_node_attr};
use crate::translation::config::constants::{DEFAULT_MAX_PROCESSED, POST_ID_ATTR, PROCESSED_ATTR};

/// 已处理集合
pub struct ProcessedTracker {
    order: LruCache<String, ()>,
    max: usize,
}

impl ProcessedTracker {
    pub fn new(max: usize) -> Self {
        Self {
            order: LruCache::unbounded(),
            max: max.max(1),
        }
    }

    /// 记录节点已处理
    ///
    /// 幂等：重复调用不会增加集合大小，也不会改变已写入的标记。
    /// 节点已脱离文档时只记录标识，不写标记。
    pub fn mark_processed(&mut self, node: &Handle, id: &str) {
        if !self.order.contains(id) {
            self.order.put(id.to_string(), ());
        }

        if !is_element(node) || !is_attached(node) {
            tracing::debug!("节点已脱离文档，跳过标记: {}", id);
            return;
        }

        if get_node_attr(node, PROCESSED_ATTR).as_deref() != Some("true") {
            set_node_attr(node, PROCESSED_ATTR, Some("true"));
        }
        if get_node_attr(node, POST_ID_ATTR).as_deref() != Some(id) {
            set_node_attr(node, POST_ID_ATTR, Some(id));
        }
    }

    /// 节点是否已处理：先看 DOM 标记，再看节点记录的标识是否仍在集合中
    pub fn is_processed(&self, node: &Handle) -> bool {
        if get_node_attr(node, PROCESSED_ATTR).as_deref() == Some("true") {
            return true;
        }
        get_node_attr(node, POST_ID_ATTR).is_some_and(|id| self.order.contains(id.as_str()))
    }

    /// 标识是否在内存集合中
    pub fn contains_id(&self, id: &str) -> bool {
        self.order.contains(id)
    }

    /// 清空内存集合并移除文档中所有标记，返回清除标记的节点数
    pub fn reset(&mut self, document: &Handle) -> usize {
        self.order.clear();

        let marked = find_descendants(document, |n| {
            get_node_attr(n, PROCESSED_ATTR).is_some() || get_node_attr(n, POST_ID_ATTR).is_some()
        });
        for node in &marked {
            set_node_attr(node, PROCESSED_ATTR, None);
            set_node_attr(node, POST_ID_ATTR, None);
        }

        tracing::debug!("已处理集合重置，清除 {} 个标记", marked.len());
        marked.len()
    }

    /// 淘汰最早插入的标识直到不超过 `max`，返回淘汰数量
    pub fn trim(&mut self, max: usize) -> usize {
        let mut evicted = 0;
        while self.order.len() > max {
            if self.order.pop_lru().is_none() {
                break;
            }
            evicted += 1;
        }

        if evicted > 0 {
            tracing::debug!("已处理集合淘汰 {} 个标识", evicted);
        }
        evicted
    }

    /// 按配置的上限淘汰
    pub fn trim_to_limit(&mut self) -> usize {
        self.trim(self.max)
    }

    pub fn set_max(&mut self, max: usize) {
        self.max = max.max(1);
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for ProcessedTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PROCESSED)
    }
}
