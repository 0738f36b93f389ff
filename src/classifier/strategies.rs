//! 帖子有效性判定级联
//!
//! 每个策略是一个具名函数，按顺序尝试，第一个命中的策略决定置信度。

use std::sync::OnceLock;

use markup5ever_rcdom::Handle;
use regex::Regex;

use crate::dom::selectors::{self, matches_any};
use crate::dom::{find_descendant, get_node_attr, get_node_name, has_ancestor_until, text_content};
use crate::translation::config::constants::MIN_SPAN_TEXT_CHARS;

/// 判定置信度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// 具名判定策略
#[derive(Debug, Clone, Copy)]
pub struct ValidityStrategy {
    pub name: &'static str,
    pub confidence: Confidence,
    pub check: fn(&Handle) -> bool,
}

/// 判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub strategy: &'static str,
    pub confidence: Confidence,
}

/// 按优先级排列的判定级联
pub const VALIDITY_CASCADE: &[ValidityStrategy] = &[
    ValidityStrategy {
        name: "container-with-text",
        confidence: Confidence::High,
        check: container_with_text,
    },
    ValidityStrategy {
        name: "lang-tagged",
        confidence: Confidence::High,
        check: has_lang_tagged,
    },
    ValidityStrategy {
        name: "long-span",
        confidence: Confidence::Medium,
        check: has_long_span,
    },
    ValidityStrategy {
        name: "time-and-profile-link",
        confidence: Confidence::Medium,
        check: has_time_and_profile_link,
    },
    ValidityStrategy {
        name: "container-only",
        confidence: Confidence::Low,
        check: is_container,
    },
];

/// 依次尝试所有策略，全部落空时返回 `None`
pub fn validate(node: &Handle) -> Option<Verdict> {
    VALIDITY_CASCADE
        .iter()
        .find(|strategy| (strategy.check)(node))
        .map(|strategy| Verdict {
            strategy: strategy.name,
            confidence: strategy.confidence,
        })
}

pub fn is_container(node: &Handle) -> bool {
    matches_any(node, selectors::POST_CONTAINERS)
}

fn container_with_text(node: &Handle) -> bool {
    is_container(node) && find_descendant(node, |n| selectors::POST_TEXT.matches(n)).is_some()
}

/// 语言标记节点，`<html lang>` 不算
pub fn is_lang_tagged(node: &Handle) -> bool {
    selectors::LANG_TAGGED.matches(node) && get_node_name(node) != Some("html")
}

fn has_lang_tagged(node: &Handle) -> bool {
    find_descendant(node, is_lang_tagged).is_some()
}

fn has_long_span(node: &Handle) -> bool {
    first_long_span(node).is_some()
}

fn has_time_and_profile_link(node: &Handle) -> bool {
    find_descendant(node, |n| selectors::TIME.matches(n)).is_some()
        && find_descendant(node, |n| {
            selectors::ANCHOR.matches(n)
                && get_node_attr(n, "href").is_some_and(|href| is_profile_path(&href))
        })
        .is_some()
}

/// 第一个足够长、不是裸链接、也不在交互控件内的 span
pub fn first_long_span(root: &Handle) -> Option<Handle> {
    find_descendant(root, |n| is_long_text_span(n, root))
}

pub fn is_long_text_span(node: &Handle, root: &Handle) -> bool {
    if !selectors::SPAN.matches(node) {
        return false;
    }

    let text = text_content(node);
    let text = text.trim();
    text.chars().count() > MIN_SPAN_TEXT_CHARS
        && !is_bare_url(text)
        && !inside_interactive(node, root)
}

/// 节点（含自身）到 `root` 之间是否有交互控件
pub fn inside_interactive(node: &Handle, root: &Handle) -> bool {
    has_ancestor_until(node, root, |n| {
        matches_any(n, selectors::INTERACTIVE) || selectors::ANCHOR.matches(n)
    })
}

pub fn is_bare_url(text: &str) -> bool {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    URL_RE
        .get_or_init(|| Regex::new(r"^(?:https?://|www\.)\S+$").expect("valid url regex"))
        .is_match(text.trim())
}

/// 形如 `/handle` 的个人主页路径
pub fn is_profile_path(href: &str) -> bool {
    static PROFILE_RE: OnceLock<Regex> = OnceLock::new();
    PROFILE_RE
        .get_or_init(|| Regex::new(r"^/[A-Za-z0-9_]{1,15}/?$").expect("valid profile regex"))
        .is_match(href)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::html_to_dom;

    fn root(html: &str) -> Handle {
        let dom = html_to_dom(html.as_bytes(), "utf-8").expect("parse");
        find_descendant(&dom.document, |n| get_node_attr(n, "id").as_deref() == Some("root"))
            .expect("root")
    }

    #[test]
    fn test_canonical_container_wins() {
        let node = root(
            r#"<article id="root" data-testid="tweet"><div data-testid="tweetText" lang="en">hi</div></article>"#,
        );
        assert_eq!(validate(&node).map(|v| v.strategy), Some("container-with-text"));
    }

    #[test]
    fn test_lang_tagged_descendant() {
        let node = root(r#"<div id="root"><div lang="ja">こんにちは</div></div>"#);
        assert_eq!(validate(&node).map(|v| v.strategy), Some("lang-tagged"));
    }

    #[test]
    fn test_long_span_excludes_urls_and_controls() {
        let url_only = root(r#"<div id="root"><span>https://example.com/some/long/path</span></div>"#);
        assert!(validate(&url_only).is_none());

        let in_button =
            root(r#"<div id="root"><div role="button"><span>Show more replies here</span></div></div>"#);
        assert!(validate(&in_button).is_none());

        let plain = root(r#"<div id="root"><span>This is a regular sentence.</span></div>"#);
        assert_eq!(validate(&plain).map(|v| v.strategy), Some("long-span"));
    }

    #[test]
    fn test_time_and_profile_link() {
        let node = root(
            r#"<div id="root"><a href="/someone">x</a><time datetime="2024-01-01T00:00:00Z">1h</time></div>"#,
        );
        let verdict = validate(&node).expect("verdict");
        assert_eq!(verdict.strategy, "time-and-profile-link");
        assert_eq!(verdict.confidence, Confidence::Medium);
    }

    #[test]
    fn test_container_only_is_low_confidence() {
        let node = root(r#"<article id="root" role="article"><img src="a.png"></article>"#);
        assert_eq!(validate(&node).map(|v| v.confidence), Some(Confidence::Low));
    }

    #[test]
    fn test_non_post_is_rejected() {
        let node = root(r#"<nav id="root"><a href="/home">Home</a></nav>"#);
        assert!(validate(&node).is_none());
    }

    #[test]
    fn test_profile_path() {
        assert!(is_profile_path("/jack"));
        assert!(is_profile_path("/jack/"));
        assert!(!is_profile_path("/jack/status/20"));
        assert!(!is_profile_path("https://x.com/jack"));
    }
}
