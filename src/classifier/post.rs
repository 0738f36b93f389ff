use std::rc::Weak;

use markup5ever_rcdom::{Handle, Node};
use serde::Serialize;

use crate::identity::IdSource;

/// 作者信息，字段缺失时使用占位值
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    pub name: String,
    pub handle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Author {
    pub const UNKNOWN_NAME: &'static str = "Unknown";
    pub const UNKNOWN_HANDLE: &'static str = "unknown";

    pub fn unknown() -> Self {
        Self {
            name: Self::UNKNOWN_NAME.to_string(),
            handle: Self::UNKNOWN_HANDLE.to_string(),
            avatar: None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.handle == Self::UNKNOWN_HANDLE
    }
}

/// 互动计数，无法解析的字段省略
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retweets: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,
}

impl Metrics {
    pub fn is_empty(&self) -> bool {
        self.replies.is_none() && self.retweets.is_none() && self.likes.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
    Gif,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaItem {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub url: String,
}

/// 一次扫描得到的帖子
///
/// `element` 只是指向宿主文档节点的弱引用，帖子不拥有节点，也不应在扫描结束后保留。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    #[serde(skip)]
    pub id_source: IdSource,
    pub text: String,
    pub author: Author,
    pub timestamp: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    /// `None` 表示没有媒体，和空列表区分
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<MediaItem>>,
    pub is_reply: bool,
    pub is_retweet: bool,
    #[serde(skip)]
    pub element: Weak<Node>,
    /// 未能提取、使用了回退值的字段
    #[serde(skip)]
    pub degraded: Vec<&'static str>,
}

impl Post {
    /// 升级为强引用，节点已被释放时返回 `None`
    pub fn element(&self) -> Option<Handle> {
        self.element.upgrade()
    }
}
