//! 翻译按钮注入
//!
//! 每个帖子标识最多对应一棵界面子树：
//!
//! ```text
//! <div data-ft-ui="<id>" data-ft-state="button" style="all: initial; ...">
//!   <button type="button" data-ft-action="translate">Translate</button>
//!   <div data-ft-result=""></div>
//! </div>
//! ```
//!
//! 状态迁移：`NoUi → ButtonShown → Loading → Success | Error`，`Error` 可通过再次点击回到
//! `Loading`。状态更新只替换结果区域，不动按钮。

use std::collections::HashMap;
use std::rc::Rc;

use markup5ever_rcdom::Handle;

use crate::classifier::extract::ANCHOR_CASCADE;
use crate::classifier::Post;
use crate::dom::{
    append_child, clear_children, create_element, create_text, detach, insert_after, is_attached,
    set_node_attr,
};
use crate::translation::config::constants::{
    DEFAULT_BUTTON_LABEL, UI_RESULT_ATTR, UI_ROOT_ATTR, UI_STATE_ATTR,
};

const ISOLATED_STYLE: &str = "all: initial; display: block; margin-top: 4px; font: inherit;";
const LOADING_TEXT: &str = "Translating…";

/// 界面状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiState {
    NoUi,
    ButtonShown,
    Loading,
    Success(String),
    Error { message: String, retryable: bool },
}

impl UiState {
    fn marker(&self) -> &'static str {
        match self {
            UiState::NoUi => "none",
            UiState::ButtonShown => "button",
            UiState::Loading => "loading",
            UiState::Success(_) => "success",
            UiState::Error { .. } => "error",
        }
    }

    /// 用户点击按钮是否发起翻译
    pub fn accepts_action(&self) -> bool {
        matches!(self, UiState::ButtonShown | UiState::Error { .. })
    }
}

/// 用户发起的翻译请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateIntent {
    pub post_id: String,
    pub text: String,
}

/// 翻译请求回调，由界面层之外的代码实现
pub type TranslateCallback = Rc<dyn Fn(&TranslateIntent)>;

/// 注入结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectOutcome {
    Injected { anchor: &'static str },
    AlreadyPresent,
    Skipped { reason: String },
}

struct UiSlot {
    root: Handle,
    result: Handle,
    state: UiState,
    text: String,
    on_translate: TranslateCallback,
}

/// 注入控制器
pub struct InjectionController {
    slots: HashMap<String, UiSlot>,
    button_label: String,
}

impl InjectionController {
    pub fn new(button_label: impl Into<String>) -> Self {
        Self {
            slots: HashMap::new(),
            button_label: button_label.into(),
        }
    }

    /// 在帖子正文附近插入翻译按钮，该标识已有界面时不做任何事
    pub fn inject(&mut self, post: &Post, on_translate: TranslateCallback) -> InjectOutcome {
        if let Some(slot) = self.slots.get(&post.id) {
            if is_attached(&slot.root) {
                return InjectOutcome::AlreadyPresent;
            }
            // 虚拟列表回收了旧节点，旧子树已不可见
            tracing::debug!("帖子 {} 的界面已脱离文档，重新注入", post.id);
            self.slots.remove(&post.id);
        }

        let Some(container) = post.element() else {
            return self.skip(post, "容器已被释放");
        };

        let (root, result) = self.build_ui(&post.id);
        let anchor_name = match locate_anchor(&container) {
            Some((name, anchor)) => {
                if !insert_after(&anchor, &root) {
                    return self.skip(post, "锚点没有父节点");
                }
                name
            }
            None if is_attached(&container) => {
                append_child(&container, &root);
                "container"
            }
            None => return self.skip(post, "找不到锚点"),
        };

        self.slots.insert(
            post.id.clone(),
            UiSlot {
                root,
                result,
                state: UiState::ButtonShown,
                text: post.text.clone(),
                on_translate,
            },
        );

        tracing::debug!("帖子 {} 注入翻译按钮，锚点策略: {}", post.id, anchor_name);
        InjectOutcome::Injected {
            anchor: anchor_name,
        }
    }

    fn skip(&self, post: &Post, reason: &str) -> InjectOutcome {
        tracing::debug!("帖子 {} 跳过注入: {}", post.id, reason);
        InjectOutcome::Skipped {
            reason: reason.to_string(),
        }
    }

    fn build_ui(&self, id: &str) -> (Handle, Handle) {
        let root = create_element(
            "div",
            &[
                (UI_ROOT_ATTR, id),
                (UI_STATE_ATTR, UiState::ButtonShown.marker()),
                ("style", ISOLATED_STYLE),
            ],
        );

        let button = create_element("button", &[("type", "button"), ("data-ft-action", "translate")]);
        append_child(&button, &create_text(&self.button_label));
        append_child(&root, &button);

        let result = create_element("div", &[(UI_RESULT_ATTR, "")]);
        append_child(&root, &result);

        (root, result)
    }

    /// 用户点击翻译按钮
    ///
    /// 只有 `ButtonShown` 与 `Error` 状态会触发回调，加载中或成功后的点击被忽略。
    pub fn click(&mut self, id: &str) -> bool {
        let Some(slot) = self.slots.get(id) else {
            return false;
        };
        if !slot.state.accepts_action() {
            tracing::trace!("帖子 {} 当前状态不接受点击", id);
            return false;
        }

        let intent = TranslateIntent {
            post_id: id.to_string(),
            text: slot.text.clone(),
        };
        let callback = Rc::clone(&slot.on_translate);
        callback(&intent);
        true
    }

    pub fn show_loading(&mut self, id: &str) -> bool {
        self.render(id, UiState::Loading)
    }

    pub fn show_result(&mut self, id: &str, text: &str) -> bool {
        self.render(id, UiState::Success(text.to_string()))
    }

    pub fn show_error(&mut self, id: &str, message: &str, retryable: bool) -> bool {
        self.render(
            id,
            UiState::Error {
                message: message.to_string(),
                retryable,
            },
        )
    }

    /// 先清空结果区域再渲染新状态，重复调用结果相同
    fn render(&mut self, id: &str, state: UiState) -> bool {
        let Some(slot) = self.slots.get_mut(id) else {
            tracing::debug!("帖子 {} 没有界面，忽略状态更新", id);
            return false;
        };

        clear_children(&slot.result);
        match &state {
            UiState::NoUi | UiState::ButtonShown => {}
            UiState::Loading => {
                let loading = create_element("span", &[("data-ft-loading", "")]);
                append_child(&loading, &create_text(LOADING_TEXT));
                append_child(&slot.result, &loading);
            }
            UiState::Success(text) => {
                let content = create_element("div", &[("data-ft-translation", "")]);
                for (i, line) in text.split('\n').enumerate() {
                    if i > 0 {
                        append_child(&content, &create_element("br", &[]));
                    }
                    append_child(&content, &create_text(line));
                }
                append_child(&slot.result, &content);
            }
            UiState::Error { message, retryable } => {
                let error = create_element(
                    "span",
                    &[
                        ("data-ft-error", ""),
                        ("data-ft-retryable", if *retryable { "true" } else { "false" }),
                    ],
                );
                append_child(&error, &create_text(message));
                append_child(&slot.result, &error);
            }
        }

        set_node_attr(&slot.root, UI_STATE_ATTR, Some(state.marker()));
        slot.state = state;
        true
    }

    /// 帖子界面状态，没有界面时为 `NoUi`
    pub fn state(&self, id: &str) -> UiState {
        self.slots
            .get(id)
            .map(|slot| slot.state.clone())
            .unwrap_or(UiState::NoUi)
    }

    /// 该标识的界面是否仍在文档中
    pub fn has_live_ui(&self, id: &str) -> bool {
        self.slots.get(id).is_some_and(|slot| is_attached(&slot.root))
    }

    /// 丢弃根节点已脱离文档的界面记录，返回丢弃数量
    pub fn prune_detached(&mut self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| is_attached(&slot.root));
        before - self.slots.len()
    }

    /// 移除所有界面，导航后调用
    pub fn reset(&mut self) -> usize {
        let count = self.slots.len();
        for slot in self.slots.values() {
            detach(&slot.root);
        }
        self.slots.clear();
        count
    }

    pub fn set_button_label(&mut self, label: impl Into<String>) {
        self.button_label = label.into();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for InjectionController {
    fn default() -> Self {
        Self::new(DEFAULT_BUTTON_LABEL)
    }
}

fn locate_anchor(container: &Handle) -> Option<(&'static str, Handle)> {
    ANCHOR_CASCADE
        .iter()
        .find_map(|strategy| (strategy.locate)(container).map(|node| (strategy.name, node)))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::classifier::classify;
    use crate::dom::{
        find_descendant, find_descendants, get_node_attr, get_node_name, get_parent_node,
        html_to_dom, same_node, text_content,
    };
    use markup5ever_rcdom::RcDom;

    fn post_dom() -> RcDom {
        html_to_dom(
            br#"<article data-testid="tweet">
                <a href="/alice/status/9"><time datetime="2024-01-01T00:00:00Z">1h</time></a>
                <div data-testid="tweetText" id="text"><span>Bonjour tout le monde</span></div>
                <div role="group"></div>
            </article>"#,
            "utf-8",
        )
        .expect("parse")
    }

    fn classify_first(dom: &RcDom) -> Post {
        let article =
            find_descendant(&dom.document, |n| get_node_name(n) == Some("article")).expect("article");
        classify(&article).expect("post")
    }

    fn recorder() -> (Rc<RefCell<Vec<TranslateIntent>>>, TranslateCallback) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, Rc::new(move |intent: &TranslateIntent| sink.borrow_mut().push(intent.clone())))
    }

    fn ui_roots(dom: &RcDom) -> Vec<Handle> {
        find_descendants(&dom.document, |n| get_node_attr(n, UI_ROOT_ATTR).is_some())
    }

    #[test]
    fn test_inject_after_text_anchor_once() {
        let dom = post_dom();
        let post = classify_first(&dom);
        let (_, callback) = recorder();
        let mut controller = InjectionController::default();

        assert_eq!(
            controller.inject(&post, Rc::clone(&callback)),
            InjectOutcome::Injected {
                anchor: "canonical-text"
            }
        );
        assert_eq!(controller.inject(&post, callback), InjectOutcome::AlreadyPresent);

        let roots = ui_roots(&dom);
        assert_eq!(roots.len(), 1);
        assert_eq!(get_node_attr(&roots[0], UI_ROOT_ATTR).as_deref(), Some("9"));

        let text = find_descendant(&dom.document, |n| get_node_attr(n, "id").as_deref() == Some("text"))
            .expect("text");
        let parent = get_parent_node(&text).expect("parent");
        let children = parent.children.borrow();
        let position = children.iter().position(|c| same_node(c, &text)).expect("position");
        assert!(same_node(&children[position + 1], &roots[0]));
    }

    #[test]
    fn test_state_machine_and_single_result_region() {
        let dom = post_dom();
        let post = classify_first(&dom);
        let (seen, callback) = recorder();
        let mut controller = InjectionController::default();
        controller.inject(&post, callback);

        assert_eq!(controller.state("9"), UiState::ButtonShown);
        assert!(controller.click("9"));
        assert_eq!(seen.borrow()[0].text, "Bonjour tout le monde");

        controller.show_loading("9");
        assert!(!controller.click("9"));

        controller.show_error("9", "timeout", true);
        assert!(controller.click("9"));
        assert_eq!(seen.borrow().len(), 2);

        controller.show_loading("9");
        controller.show_result("9", "大家好");
        controller.show_result("9", "大家好");
        assert_eq!(controller.state("9"), UiState::Success("大家好".to_string()));

        let root = &ui_roots(&dom)[0];
        assert_eq!(get_node_attr(root, UI_STATE_ATTR).as_deref(), Some("success"));
        let result = find_descendant(root, |n| get_node_attr(n, UI_RESULT_ATTR).is_some())
            .expect("result region");
        assert_eq!(result.children.borrow().len(), 1);
        assert_eq!(text_content(&result), "大家好");
        assert!(find_descendant(root, |n| get_node_name(n) == Some("button")).is_some());
    }

    #[test]
    fn test_container_fallback_and_reinject_after_detach() {
        let dom = html_to_dom(br#"<article role="article"><img src="a.png"></article>"#, "utf-8")
            .expect("parse");
        let post = classify_first(&dom);
        let (_, callback) = recorder();
        let mut controller = InjectionController::default();

        assert_eq!(
            controller.inject(&post, Rc::clone(&callback)),
            InjectOutcome::Injected { anchor: "container" }
        );
        let root = ui_roots(&dom).remove(0);
        detach(&root);
        assert!(!controller.has_live_ui(&post.id));

        assert!(matches!(
            controller.inject(&post, callback),
            InjectOutcome::Injected { .. }
        ));
        assert_eq!(ui_roots(&dom).len(), 1);
    }

    #[test]
    fn test_dropped_container_is_skipped() {
        let post = {
            let dom = post_dom();
            classify_first(&dom)
        };
        let (_, callback) = recorder();
        let mut controller = InjectionController::default();

        assert!(matches!(
            controller.inject(&post, callback),
            InjectOutcome::Skipped { .. }
        ));
        assert_eq!(controller.state(&post.id), UiState::NoUi);
        assert!(!controller.show_loading(&post.id));
    }

    #[test]
    fn test_reset_removes_ui() {
        let dom = post_dom();
        let post = classify_first(&dom);
        let (_, callback) = recorder();
        let mut controller = InjectionController::default();
        controller.inject(&post, callback);

        assert_eq!(controller.reset(), 1);
        assert!(ui_roots(&dom).is_empty());
        assert!(controller.is_empty());
    }
}
