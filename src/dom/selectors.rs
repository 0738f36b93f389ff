//! 站点选择器表
//!
//! 目标站点的 DOM 没有版本保证，这里把所有依赖的标签和属性集中成静态表，
//! 分类器、发现策略和注入控制器都只通过这些表访问页面结构。

use markup5ever_rcdom::Handle;

use super::node::{get_node_attr, get_node_name};

/// 属性匹配方式
#[derive(Debug, Clone, Copy)]
pub enum AttrMatch {
    Exists(&'static str),
    Equals(&'static str, &'static str),
    Prefix(&'static str, &'static str),
    Contains(&'static str, &'static str),
}

impl AttrMatch {
    fn matches(&self, node: &Handle) -> bool {
        match *self {
            AttrMatch::Exists(name) => get_node_attr(node, name).is_some(),
            AttrMatch::Equals(name, expected) => {
                get_node_attr(node, name).is_some_and(|value| value == expected)
            }
            AttrMatch::Prefix(name, prefix) => {
                get_node_attr(node, name).is_some_and(|value| value.starts_with(prefix))
            }
            AttrMatch::Contains(name, needle) => {
                get_node_attr(node, name).is_some_and(|value| value.contains(needle))
            }
        }
    }
}

/// 简化的 CSS 选择器：可选标签名 + 全部属性条件
#[derive(Debug, Clone, Copy)]
pub struct Selector {
    pub tag: Option<&'static str>,
    pub attrs: &'static [AttrMatch],
}

impl Selector {
    pub const fn tag(tag: &'static str) -> Self {
        Self { tag: Some(tag), attrs: &[] }
    }

    pub const fn attrs(attrs: &'static [AttrMatch]) -> Self {
        Self { tag: None, attrs }
    }

    pub const fn tag_attrs(tag: &'static str, attrs: &'static [AttrMatch]) -> Self {
        Self { tag: Some(tag), attrs }
    }

    pub fn matches(&self, node: &Handle) -> bool {
        let Some(name) = get_node_name(node) else {
            return false;
        };
        if let Some(tag) = self.tag {
            if !name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        self.attrs.iter().all(|attr| attr.matches(node))
    }
}

/// 任意选择器命中
pub fn matches_any(node: &Handle, selectors: &[Selector]) -> bool {
    selectors.iter().any(|selector| selector.matches(node))
}

pub const TEST_ID: &str = "data-testid";

/// 帖子容器
pub const POST_CONTAINERS: &[Selector] = &[
    Selector::tag_attrs("article", &[AttrMatch::Equals(TEST_ID, "tweet")]),
    Selector::attrs(&[AttrMatch::Equals(TEST_ID, "tweet")]),
    Selector::tag_attrs("article", &[AttrMatch::Equals("role", "article")]),
];

/// 帖子正文
pub const POST_TEXT: Selector = Selector::attrs(&[AttrMatch::Equals(TEST_ID, "tweetText")]);

/// 带语言标记的自然语言片段
pub const LANG_TAGGED: Selector = Selector::attrs(&[AttrMatch::Exists("lang")]);

/// 自动方向文本块
pub const AUTO_DIR_BLOCK: Selector = Selector::tag_attrs("div", &[AttrMatch::Equals("dir", "auto")]);

pub const TIME: Selector = Selector::tag("time");
pub const ANCHOR: Selector = Selector::tag("a");
pub const SPAN: Selector = Selector::tag("span");
pub const LINE_BREAK: Selector = Selector::tag("br");
pub const IMAGE: Selector = Selector::tag("img");
pub const VIDEO: Selector = Selector::tag("video");

/// 交互控件，控件内部的文本不算正文
pub const INTERACTIVE: &[Selector] = &[
    Selector::tag("button"),
    Selector::attrs(&[AttrMatch::Equals("role", "button")]),
    Selector::attrs(&[AttrMatch::Equals("role", "link")]),
];

pub const USER_NAME: Selector = Selector::attrs(&[AttrMatch::Equals(TEST_ID, "User-Name")]);
pub const AVATAR: Selector = Selector::attrs(&[AttrMatch::Prefix(TEST_ID, "Tweet-User-Avatar")]);
pub const SOCIAL_CONTEXT: Selector = Selector::attrs(&[AttrMatch::Equals(TEST_ID, "socialContext")]);

pub const REPLY_METRIC: &[Selector] = &[Selector::attrs(&[AttrMatch::Equals(TEST_ID, "reply")])];
pub const RETWEET_METRIC: &[Selector] = &[
    Selector::attrs(&[AttrMatch::Equals(TEST_ID, "retweet")]),
    Selector::attrs(&[AttrMatch::Equals(TEST_ID, "unretweet")]),
];
pub const LIKE_METRIC: &[Selector] = &[
    Selector::attrs(&[AttrMatch::Equals(TEST_ID, "like")]),
    Selector::attrs(&[AttrMatch::Equals(TEST_ID, "unlike")]),
];

pub const PHOTO: Selector = Selector::attrs(&[AttrMatch::Equals(TEST_ID, "tweetPhoto")]);
pub const VIDEO_PLAYER: Selector = Selector::attrs(&[AttrMatch::Equals(TEST_ID, "videoPlayer")]);
pub const GIF_PLAYER: Selector = Selector::attrs(&[AttrMatch::Equals(TEST_ID, "gifPlayer")]);

/// 时间线单元格，虚拟列表按单元格回收
pub const TIMELINE_CELL: Selector = Selector::attrs(&[AttrMatch::Equals(TEST_ID, "cellInnerDiv")]);

/// 时间线容器
pub const TIMELINE_CONTAINERS: &[Selector] = &[
    Selector::attrs(&[AttrMatch::Equals(TEST_ID, "primaryColumn")]),
    Selector::tag_attrs("section", &[AttrMatch::Equals("role", "region")]),
    Selector::attrs(&[AttrMatch::Prefix("aria-label", "Timeline")]),
];
