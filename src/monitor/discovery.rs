//! 候选容器发现
//!
//! 对每个新增节点依次运行多种发现策略，结果按节点身份去重后再交给分类器。

use std::rc::Rc;

use markup5ever_rcdom::Handle;

use crate::classifier::strategies::{is_container, is_lang_tagged};
use crate::dom::selectors::{self, matches_any};
use crate::dom::{
    closest, document_of, document_positions, find_descendants, find_descendants_within,
    get_node_attr, get_node_name,
};
use crate::translation::config::constants::{MAX_DEEP_SCAN_DEPTH, UI_ROOT_ATTR};

/// 具名发现策略
pub struct DiscoveryStrategy {
    pub name: &'static str,
    pub discover: fn(&Handle) -> Vec<Handle>,
}

/// 发现策略，按顺序运行并取并集
pub const DISCOVERY_STRATEGIES: &[DiscoveryStrategy] = &[
    DiscoveryStrategy {
        name: "direct-match",
        discover: direct_match,
    },
    DiscoveryStrategy {
        name: "descendant-query",
        discover: |node| find_descendants(node, is_container),
    },
    DiscoveryStrategy {
        name: "css-heuristic",
        discover: css_heuristic,
    },
    DiscoveryStrategy {
        name: "deep-traversal",
        discover: |node| find_descendants_within(node, MAX_DEEP_SCAN_DEPTH, is_article),
    },
    DiscoveryStrategy {
        name: "container-rescan",
        discover: container_rescan,
    },
];

fn is_article(node: &Handle) -> bool {
    get_node_name(node) == Some("article") || is_container(node)
}

fn direct_match(node: &Handle) -> Vec<Handle> {
    if is_article(node) {
        vec![node.clone()]
    } else {
        Vec::new()
    }
}

/// 从正文、语言标记、时间线单元格向上找到所在的容器
fn css_heuristic(node: &Handle) -> Vec<Handle> {
    let is_hint = |n: &Handle| {
        selectors::POST_TEXT.matches(n) || is_lang_tagged(n) || selectors::TIMELINE_CELL.matches(n)
    };

    let mut hints = find_descendants(node, is_hint);
    if is_hint(node) {
        hints.insert(0, node.clone());
    }

    hints
        .iter()
        .flat_map(|hint| {
            if selectors::TIMELINE_CELL.matches(hint) {
                find_descendants(hint, is_article)
            } else {
                closest(hint, is_article).into_iter().collect()
            }
        })
        .collect()
}

/// 新增的是时间线容器或单元格时，重扫整个时间线
fn container_rescan(node: &Handle) -> Vec<Handle> {
    if !matches_any(node, selectors::TIMELINE_CONTAINERS) && !selectors::TIMELINE_CELL.matches(node)
    {
        return Vec::new();
    }

    let timeline = closest(node, |n| matches_any(n, selectors::TIMELINE_CONTAINERS))
        .unwrap_or_else(|| node.clone());
    find_descendants(&timeline, is_article)
}

/// 是否位于注入的界面内部
fn inside_injected_ui(node: &Handle) -> bool {
    closest(node, |n| get_node_attr(n, UI_ROOT_ATTR).is_some()).is_some()
}

/// 对一个节点运行所有策略
pub fn discover(node: &Handle) -> Vec<Handle> {
    let mut found = Vec::new();
    for strategy in DISCOVERY_STRATEGIES {
        let candidates = (strategy.discover)(node);
        if !candidates.is_empty() {
            tracing::trace!("发现策略 {} 找到 {} 个候选", strategy.name, candidates.len());
        }
        push_unique(&mut found, candidates);
    }
    found
}

/// 对一批新增节点运行发现，去重后按文档顺序返回
pub fn discover_all(nodes: &[Handle]) -> Vec<Handle> {
    let mut found = Vec::new();
    for node in nodes {
        if inside_injected_ui(node) {
            continue;
        }
        push_unique(&mut found, discover(node));
    }
    sort_in_document_order(&mut found);
    found
}

fn push_unique(found: &mut Vec<Handle>, candidates: Vec<Handle>) {
    for candidate in candidates {
        if !found.iter().any(|f| Rc::ptr_eq(f, &candidate)) {
            found.push(candidate);
        }
    }
}

/// 按文档先序排序，已脱离文档的节点排在最后并保持原有相对顺序
pub fn sort_in_document_order(nodes: &mut [Handle]) {
    let Some(document) = nodes.iter().find_map(document_of) else {
        return;
    };
    let positions = document_positions(&document);
    nodes.sort_by_key(|node| {
        positions
            .get(&Rc::as_ptr(node))
            .copied()
            .unwrap_or(usize::MAX)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{find_descendant, html_to_dom};

    fn by_id(document: &Handle, id: &str) -> Handle {
        find_descendant(document, |n| get_node_attr(n, "id").as_deref() == Some(id)).expect("node")
    }

    #[test]
    fn test_direct_and_descendant_matches() {
        let dom = html_to_dom(
            br#"<div id="root"><article id="a1"></article><div><article data-testid="tweet" id="a2"></article></div></div>"#,
            "utf-8",
        )
        .expect("parse");
        let root = by_id(&dom.document, "root");

        let found = discover_all(&[root]);
        let ids: Vec<_> = found.iter().filter_map(|n| get_node_attr(n, "id")).collect();
        assert_eq!(ids, vec!["a1", "a2"]);
    }

    #[test]
    fn test_heuristic_climbs_to_container() {
        let dom = html_to_dom(
            br#"<article id="post"><div><div lang="en" id="text">hello</div></div></article>"#,
            "utf-8",
        )
        .expect("parse");
        let text = by_id(&dom.document, "text");

        let found = discover_all(&[text]);
        assert_eq!(found.len(), 1);
        assert_eq!(get_node_attr(&found[0], "id").as_deref(), Some("post"));
    }

    #[test]
    fn test_deep_traversal_is_bounded() {
        let shallow = html_to_dom(
            br#"<div id="root"><div><div><article id="near"></article></div></div></div>"#,
            "utf-8",
        )
        .expect("parse");
        let root = by_id(&shallow.document, "root");
        assert_eq!(discover(&root).len(), 1);

        let deep = html_to_dom(
            br#"<div id="root"><div><div><div><div><div><div><article id="far"></article></div></div></div></div></div></div></div>"#,
            "utf-8",
        )
        .expect("parse");
        let root = by_id(&deep.document, "root");
        assert!(discover(&root).is_empty());
    }

    #[test]
    fn test_union_preserves_document_order_and_dedups() {
        let dom = html_to_dom(
            br#"<section role="region" id="tl"><div data-testid="cellInnerDiv" id="c1"><article id="a1"></article></div><div data-testid="cellInnerDiv" id="c2"><article id="a2"></article></div></section>"#,
            "utf-8",
        )
        .expect("parse");
        let c2 = by_id(&dom.document, "c2");
        let a1 = by_id(&dom.document, "a1");

        let found = discover_all(&[c2, a1]);
        let ids: Vec<_> = found.iter().filter_map(|n| get_node_attr(n, "id")).collect();
        assert_eq!(ids, vec!["a1", "a2"]);
    }

    #[test]
    fn test_injected_ui_is_ignored() {
        let dom = html_to_dom(
            r#"<article id="post"><div data-ft-ui="1" id="ui"><span lang="zh">译文</span></div></article>"#
                .as_bytes(),
            "utf-8",
        )
        .expect("parse");
        let ui = by_id(&dom.document, "ui");
        assert!(discover_all(&[ui]).is_empty());
    }
}
