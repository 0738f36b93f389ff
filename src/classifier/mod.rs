//! 帖子分类器
//!
//! 给定一个 DOM 节点，判断它是否是帖子容器并提取结构化字段：
//!
//! - `strategies`: 有效性判定级联
//! - `extract`: 正文、作者、时间、链接、社交上下文
//! - `metrics`: 互动计数
//! - `media`: 图片、视频、GIF
//! - `post`: 数据模型
//!
//! 分类和提取从不向外抛出错误：不是帖子时返回 `None`，可选字段缺失时省略。

pub mod extract;
pub mod media;
pub mod metrics;
pub mod post;
pub mod strategies;

use std::rc::Rc;

use markup5ever_rcdom::Handle;

use crate::identity::{find_permalink, resolve_id, timestamp_permalink};

pub use extract::{extract_text, locate_text_node, node_plain_text, ANCHOR_CASCADE, TEXT_CASCADE};
pub use metrics::parse_metric;
pub use post::{Author, MediaItem, MediaKind, Metrics, Post};
pub use strategies::{validate, Confidence, Verdict, VALIDITY_CASCADE};

/// 分类一个节点
pub fn classify(node: &Handle) -> Option<Post> {
    let verdict = validate(node)?;
    tracing::trace!("节点通过判定策略: {}", verdict.strategy);

    let mut degraded = Vec::new();

    let text = extract_text(node);
    if text.is_empty() {
        degraded.push("text");
    }

    let resolved = resolve_id(node, &text);

    let author = extract::extract_author(node);
    if author.is_unknown() {
        degraded.push("author");
    }

    let timestamp = extract::extract_timestamp(node).unwrap_or_else(|| {
        degraded.push("timestamp");
        extract::now_timestamp()
    });

    let permalink = find_permalink(node).or_else(|| timestamp_permalink(node));
    if permalink.is_none() {
        degraded.push("url");
    }
    let url = extract::canonical_url(permalink.as_ref(), &author, &resolved.id);

    let social = extract::detect_social_context(node);

    Some(Post {
        id: resolved.id,
        id_source: resolved.source,
        text,
        author,
        timestamp,
        url,
        metrics: metrics::extract_metrics(node),
        media: media::extract_media(node),
        is_reply: social.is_reply,
        is_retweet: social.is_retweet,
        element: Rc::downgrade(node),
        degraded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{find_descendant, get_node_name, html_to_dom, same_node};
    use crate::identity::IdSource;

    #[test]
    fn test_status_link_time_and_span_classify() {
        let dom = html_to_dom(
            br#"<div><article>
                <a href="https://x.com/user/status/42"><time datetime="2024-05-01T08:00:00Z">May 1</time></a>
                <span>This is a thirty char sentence</span>
            </article></div>"#,
            "utf-8",
        )
        .expect("parse");
        let article =
            find_descendant(&dom.document, |n| get_node_name(n) == Some("article")).expect("article");

        let post = classify(&article).expect("post");
        assert_eq!(post.id, "42");
        assert_eq!(post.id_source, IdSource::Permalink);
        assert_eq!(post.text, "This is a thirty char sentence");
        assert!(!post.is_reply);
        assert!(!post.is_retweet);
        assert_eq!(post.url, "https://x.com/user/status/42");
        assert_eq!(post.timestamp, "2024-05-01T08:00:00.000Z");
        assert!(post.media.is_none());
        assert!(same_node(&post.element().expect("alive"), &article));
    }

    #[test]
    fn test_degraded_fields_are_reported() {
        let dom = html_to_dom(
            br#"<article role="article"><img src="x.png"></article>"#,
            "utf-8",
        )
        .expect("parse");
        let article =
            find_descendant(&dom.document, |n| get_node_name(n) == Some("article")).expect("article");

        let post = classify(&article).expect("low confidence post");
        assert_eq!(post.text, "");
        assert_eq!(post.id_source, IdSource::Ephemeral);
        assert!(post.degraded.contains(&"text"));
        assert!(post.degraded.contains(&"author"));
        assert!(post.degraded.contains(&"timestamp"));
        assert!(post.degraded.contains(&"url"));
        assert!(post.url.starts_with("https://x.com/unknown/status/t"));
    }

    #[test]
    fn test_miss_returns_none() {
        let dom = html_to_dom(b"<aside><a href='/explore'>Explore</a></aside>", "utf-8").expect("parse");
        let aside =
            find_descendant(&dom.document, |n| get_node_name(n) == Some("aside")).expect("aside");
        assert!(classify(&aside).is_none());
    }
}
