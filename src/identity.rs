//! 帖子标识解析
//!
//! 标识按以下顺序回退：
//!
//! 1. 任一链接中的 `/status/<数字>` 永久链接
//! 2. 包裹时间元素的链接中的永久链接
//! 3. 正文的 32 位滚动哈希（base-36）
//! 4. 当前时间 + 随机后缀
//!
//! 永久链接在虚拟列表回收、重新挂载后依然稳定；哈希只要正文不变就稳定，
//! 但相同正文的不同帖子会得到同一个标识，这是已知限制。最后一级保证能产生
//! 标识，但对同一节点重复处理时不稳定。

use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use markup5ever_rcdom::Handle;
use rand::Rng;
use regex::Regex;

use crate::dom::selectors;
use crate::dom::{closest, find_descendant, find_descendants, get_node_attr, same_node};

/// 标识来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IdSource {
    Permalink,
    TimestampPermalink,
    TextHash,
    #[default]
    Ephemeral,
}

impl IdSource {
    /// 同一 DOM 状态下重复解析是否得到相同标识
    pub fn is_stable(&self) -> bool {
        !matches!(self, IdSource::Ephemeral)
    }
}

/// 解析得到的标识
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedId {
    pub id: String,
    pub source: IdSource,
}

/// 永久链接
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permalink {
    pub href: String,
    pub status_id: String,
}

struct IdStrategy {
    source: IdSource,
    resolve: fn(&Handle, &str) -> Option<String>,
}

const ID_CASCADE: &[IdStrategy] = &[
    IdStrategy {
        source: IdSource::Permalink,
        resolve: |node, _| find_permalink(node).map(|link| link.status_id),
    },
    IdStrategy {
        source: IdSource::TimestampPermalink,
        resolve: |node, _| timestamp_permalink(node).map(|link| link.status_id),
    },
    IdStrategy {
        source: IdSource::TextHash,
        resolve: |_, text| text_hash_id(text),
    },
];

/// 为帖子容器解析标识
pub fn resolve_id(node: &Handle, extracted_text: &str) -> ResolvedId {
    for strategy in ID_CASCADE {
        if let Some(id) = (strategy.resolve)(node, extracted_text) {
            return ResolvedId {
                id,
                source: strategy.source,
            };
        }
    }

    let id = ephemeral_id();
    tracing::debug!("无稳定信号，使用临时标识: {}", id);
    ResolvedId {
        id,
        source: IdSource::Ephemeral,
    }
}

fn status_regex() -> &'static Regex {
    static STATUS_RE: OnceLock<Regex> = OnceLock::new();
    STATUS_RE.get_or_init(|| Regex::new(r"/status(?:es)?/(\d+)").expect("valid status regex"))
}

/// 从链接中提取状态编号
pub fn parse_status_id(href: &str) -> Option<String> {
    status_regex()
        .captures(href)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

fn permalink_of(anchor: &Handle) -> Option<Permalink> {
    let href = get_node_attr(anchor, "href")?;
    let status_id = parse_status_id(&href)?;
    Some(Permalink { href, status_id })
}

/// 容器（含自身）内第一个指向状态页的链接
pub fn find_permalink(node: &Handle) -> Option<Permalink> {
    if selectors::ANCHOR.matches(node) {
        if let Some(link) = permalink_of(node) {
            return Some(link);
        }
    }

    find_descendants(node, |n| selectors::ANCHOR.matches(n))
        .iter()
        .find_map(permalink_of)
}

/// 包裹时间元素的链接
pub fn timestamp_permalink(node: &Handle) -> Option<Permalink> {
    let time = find_descendant(node, |n| selectors::TIME.matches(n))?;
    let anchor = closest(&time, |n| selectors::ANCHOR.matches(n))?;

    // 链接必须位于容器内部
    let inside = closest(&anchor, |n| same_node(n, node)).is_some();
    if !inside {
        return None;
    }

    permalink_of(&anchor)
}

fn text_hash_id(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(format!("h{}", to_base36(u64::from(rolling_hash(text)))))
}

/// 32 位滚动哈希，按 UTF-16 码元累积
pub fn rolling_hash(text: &str) -> u32 {
    text.encode_utf16().fold(0u32, |hash, unit| {
        // hash * 31，再与码元异或
        (hash << 5).wrapping_sub(hash) ^ u32::from(unit)
    })
}

/// 转换为小写 base-36
pub fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut buf = Vec::new();
    while value > 0 {
        buf.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    buf.reverse();
    String::from_utf8_lossy(&buf).to_string()
}

fn ephemeral_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    let suffix: u64 = rand::thread_rng().gen_range(0..36u64.pow(6));
    format!("t{}{:0>6}", to_base36(millis), to_base36(suffix))
}
