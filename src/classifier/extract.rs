//! 字段提取
//!
//! 所有提取都是尽力而为：失败时返回 `None` 或占位值，由调用方记录降级字段。

use chrono::{DateTime, SecondsFormat, Utc};
use markup5ever_rcdom::Handle;
use url::Url;

use super::post::Author;
use super::strategies::{first_long_span, inside_interactive, is_lang_tagged, is_profile_path};
use crate::dom::selectors;
use crate::dom::{
    create_text, deep_clone, descendants, detach, find_descendant, find_descendants, get_node_attr,
    get_parent_node, insert_after, text_content,
};
use crate::identity::{parse_status_id, Permalink};
use crate::translation::config::constants::SITE_ORIGIN;

/// 具名正文定位策略
pub struct TextStrategy {
    pub name: &'static str,
    pub locate: fn(&Handle) -> Option<Handle>,
}

/// 正文定位级联
pub const TEXT_CASCADE: &[TextStrategy] = &[
    TextStrategy {
        name: "canonical-text",
        locate: |node| find_descendant(node, |n| selectors::POST_TEXT.matches(n)),
    },
    TextStrategy {
        name: "auto-dir-span",
        locate: auto_dir_span,
    },
    TextStrategy {
        name: "long-span",
        locate: first_long_span,
    },
];

/// 注入锚点级联：正文、语言标记、自动方向块、长文本 span
pub const ANCHOR_CASCADE: &[TextStrategy] = &[
    TextStrategy {
        name: "canonical-text",
        locate: |node| find_descendant(node, |n| selectors::POST_TEXT.matches(n)),
    },
    TextStrategy {
        name: "lang-tagged",
        locate: |node| find_descendant(node, is_lang_tagged),
    },
    TextStrategy {
        name: "auto-dir-block",
        locate: |node| find_descendant(node, |n| selectors::AUTO_DIR_BLOCK.matches(n)),
    },
    TextStrategy {
        name: "long-span",
        locate: first_long_span,
    },
];

fn auto_dir_span(node: &Handle) -> Option<Handle> {
    find_descendants(node, |n| selectors::AUTO_DIR_BLOCK.matches(n))
        .iter()
        .find_map(|block| {
            find_descendant(block, |n| {
                selectors::SPAN.matches(n)
                    && !inside_interactive(n, node)
                    && !text_content(n).trim().is_empty()
            })
        })
}

/// 按级联定位正文节点
pub fn locate_text_node(container: &Handle) -> Option<(&'static str, Handle)> {
    TEXT_CASCADE
        .iter()
        .find_map(|strategy| (strategy.locate)(container).map(|node| (strategy.name, node)))
}

/// 提取正文，找不到时返回空串
pub fn extract_text(container: &Handle) -> String {
    locate_text_node(container)
        .map(|(_, node)| node_plain_text(&node))
        .unwrap_or_default()
}

/// 在副本上把节点转换为纯文本，不修改实际文档
pub fn node_plain_text(node: &Handle) -> String {
    let copy = deep_clone(node);

    for element in descendants(&copy) {
        if selectors::LINE_BREAK.matches(&element) {
            replace_with_text(&element, "\n");
        } else if selectors::IMAGE.matches(&element) {
            // 表情以 <img alt="😀"> 渲染
            let alt = get_node_attr(&element, "alt").unwrap_or_default();
            replace_with_text(&element, &alt);
        }
    }

    normalize_whitespace(&text_content(&copy))
}

fn replace_with_text(element: &Handle, text: &str) {
    if get_parent_node(element).is_some() {
        insert_after(element, &create_text(text));
        detach(element);
    }
}

/// 合并每行内的连续空白，保留换行
pub fn normalize_whitespace(text: &str) -> String {
    text.split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// 提取作者，失败时退回到相对路径链接，最终使用占位值
pub fn extract_author(container: &Handle) -> Author {
    let mut author = find_descendant(container, |n| selectors::USER_NAME.matches(n))
        .and_then(|block| author_from_block(&block))
        .or_else(|| author_from_links(container))
        .unwrap_or_else(Author::unknown);

    author.avatar = find_descendant(container, |n| selectors::AVATAR.matches(n))
        .and_then(|avatar| find_descendant(&avatar, |n| selectors::IMAGE.matches(n)))
        .and_then(|img| get_node_attr(&img, "src"));

    author
}

fn author_from_block(block: &Handle) -> Option<Author> {
    let leaves: Vec<String> = find_descendants(block, |n| {
        selectors::SPAN.matches(n) && find_descendant(n, |c| selectors::SPAN.matches(c)).is_none()
    })
    .iter()
    .map(|span| node_plain_text(span))
    .filter(|text| !text.is_empty() && text != "·")
    .collect();

    let handle = leaves
        .iter()
        .find(|text| text.starts_with('@'))
        .map(|text| text.trim_start_matches('@').to_string())?;
    let name = leaves
        .iter()
        .find(|text| !text.starts_with('@'))
        .cloned()
        .unwrap_or_else(|| handle.clone());

    Some(Author {
        name,
        handle,
        avatar: None,
    })
}

fn author_from_links(container: &Handle) -> Option<Author> {
    let anchor = find_descendants(container, |n| selectors::ANCHOR.matches(n))
        .into_iter()
        .find(|a| {
            get_node_attr(a, "href")
                .is_some_and(|href| is_profile_path(&href) && parse_status_id(&href).is_none())
        })?;

    let handle = get_node_attr(&anchor, "href")?.trim_matches('/').to_string();
    let name = node_plain_text(&anchor);
    Some(Author {
        name: if name.is_empty() || name.starts_with('@') {
            handle.clone()
        } else {
            name
        },
        handle,
        avatar: None,
    })
}

/// 时间元素的 ISO-8601 时间
pub fn extract_timestamp(container: &Handle) -> Option<String> {
    let time = find_descendant(container, |n| selectors::TIME.matches(n))?;
    let raw = get_node_attr(&time, "datetime")?;
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// 当前时间，作为时间戳的回退值
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 把永久链接解析为绝对地址
pub fn absolute_url(href: &str) -> Option<String> {
    Url::parse(SITE_ORIGIN)
        .ok()?
        .join(href)
        .ok()
        .map(|url| url.to_string())
}

/// 优先使用页面上的永久链接，否则按作者与标识合成
pub fn canonical_url(permalink: Option<&Permalink>, author: &Author, id: &str) -> String {
    permalink
        .and_then(|link| absolute_url(&link.href))
        .unwrap_or_else(|| format!("{}/{}/status/{}", SITE_ORIGIN, author.handle, id))
}

const RETWEET_MARKERS: &[&str] = &[
    "reposted",
    "retweeted",
    "转帖了",
    "已转帖",
    "转推了",
    "轉推了",
    "リポスト",
    "リツイート",
    "reposteó",
    "retwitteó",
    "a republié",
    "a retweeté",
    "hat repostet",
    "hat retweetet",
    "repostou",
];

const REPLY_MARKERS: &[&str] = &[
    "replying to",
    "replied",
    "回复",
    "回覆",
    "返信先",
    "respondiendo a",
    "en réponse à",
    "antwort an",
    "respondendo a",
];

/// 社交上下文标记
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SocialContext {
    pub is_reply: bool,
    pub is_retweet: bool,
}

/// 在社交上下文块中按多语言短语判断回复与转发
pub fn detect_social_context(container: &Handle) -> SocialContext {
    let Some(block) = find_descendant(container, |n| selectors::SOCIAL_CONTEXT.matches(n)) else {
        return SocialContext::default();
    };

    let text = node_plain_text(&block).to_lowercase();
    SocialContext {
        is_reply: REPLY_MARKERS.iter().any(|marker| text.contains(marker)),
        is_retweet: RETWEET_MARKERS.iter().any(|marker| text.contains(marker)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{get_node_name, html_to_dom, serialize_node};

    fn article(html: &str) -> Handle {
        let dom = html_to_dom(html.as_bytes(), "utf-8").expect("parse");
        find_descendant(&dom.document, |n| get_node_name(n) == Some("article")).expect("article")
    }

    #[test]
    fn test_text_keeps_line_breaks_and_emoji() {
        let node = article(
            r#"<article><div data-testid="tweetText"><span>Hello   there</span><br><span>second</span> <img alt="🎉" src="e.svg"> line</div></article>"#,
        );
        let before = serialize_node(&node);

        assert_eq!(extract_text(&node), "Hello there\nsecond 🎉 line");
        assert_eq!(serialize_node(&node), before);
    }

    #[test]
    fn test_text_cascade_falls_back() {
        let auto_dir = article(
            r#"<article><div dir="auto"><span>short</span></div><span>a much longer sentence here</span></article>"#,
        );
        assert_eq!(locate_text_node(&auto_dir).map(|(name, _)| name), Some("auto-dir-span"));
        assert_eq!(extract_text(&auto_dir), "short");

        let long_span = article(r#"<article><span>a much longer sentence here</span></article>"#);
        assert_eq!(extract_text(&long_span), "a much longer sentence here");

        let empty = article(r#"<article><button><span>Follow this account</span></button></article>"#);
        assert_eq!(extract_text(&empty), "");
    }

    #[test]
    fn test_author_from_user_name_block() {
        let node = article(
            r#"<article>
                <div data-testid="Tweet-User-Avatar"><img src="https://pbs.example/avatar.jpg"></div>
                <div data-testid="User-Name"><a href="/alice"><span><span>Alice Liddell</span></span></a><a href="/alice"><span>@alice</span></a></div>
            </article>"#,
        );
        let author = extract_author(&node);
        assert_eq!(author.name, "Alice Liddell");
        assert_eq!(author.handle, "alice");
        assert_eq!(author.avatar.as_deref(), Some("https://pbs.example/avatar.jpg"));
    }

    #[test]
    fn test_author_from_links_skips_permalinks() {
        let node = article(
            r#"<article><a href="/bob/status/5">5m</a><a href="/bob">Bob</a></article>"#,
        );
        let author = extract_author(&node);
        assert_eq!(author.handle, "bob");
        assert_eq!(author.name, "Bob");
    }

    #[test]
    fn test_unknown_author() {
        let node = article("<article><p>anonymous</p></article>");
        assert!(extract_author(&node).is_unknown());
    }

    #[test]
    fn test_timestamp_normalized() {
        let node = article(r#"<article><time datetime="2024-03-01T12:30:00.000Z">Mar 1</time></article>"#);
        assert_eq!(extract_timestamp(&node).as_deref(), Some("2024-03-01T12:30:00.000Z"));

        let bad = article(r#"<article><time datetime="yesterday">?</time></article>"#);
        assert_eq!(extract_timestamp(&bad), None);
    }

    #[test]
    fn test_canonical_url() {
        let author = Author {
            name: "Carol".to_string(),
            handle: "carol".to_string(),
            avatar: None,
        };
        let link = Permalink {
            href: "/carol/status/9".to_string(),
            status_id: "9".to_string(),
        };

        assert_eq!(canonical_url(Some(&link), &author, "9"), "https://x.com/carol/status/9");
        assert_eq!(canonical_url(None, &author, "h1x"), "https://x.com/carol/status/h1x");
    }

    #[test]
    fn test_social_context_languages() {
        let retweet = article(
            r#"<article><span data-testid="socialContext">Dana Reposted</span></article>"#,
        );
        assert!(detect_social_context(&retweet).is_retweet);

        let reply = article(r#"<article><div data-testid="socialContext">回复 @eve</div></article>"#);
        let context = detect_social_context(&reply);
        assert!(context.is_reply);
        assert!(!context.is_retweet);

        let plain = article("<article><span>nothing</span></article>");
        assert_eq!(detect_social_context(&plain), SocialContext::default());
    }
}
