// 集成测试公共模块
//
// 提供 HTML 样例、模拟补全服务和常用辅助函数

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use markup5ever_rcdom::{Handle, RcDom};

use feed_translator::dom::{find_descendant, find_descendants, get_node_attr, get_node_name, html_to_dom};
use feed_translator::translation::{
    Completion, CompletionProvider, MemoryCacheStore, ProviderFailure, TranslationRequest,
    TranslatorConfig,
};
use feed_translator::ContentRuntime;

/// 带永久链接、时间和 30 字符正文的最小帖子
pub const STATUS_POST: &str = r#"<!DOCTYPE html><html><body><main>
<article>
  <a href="https://x.com/user/status/42"><time datetime="2024-05-01T08:00:00Z">May 1</time></a>
  <span>This is a thirty char sentence</span>
</article>
</main></body></html>"#;

/// 典型的时间线片段
pub const TIMELINE: &str = r#"<!DOCTYPE html><html><body>
<div data-testid="primaryColumn">
  <section role="region" aria-label="Timeline: Your Home Timeline">
    <div data-testid="cellInnerDiv">
      <article data-testid="tweet" role="article">
        <div data-testid="Tweet-User-Avatar"><img src="https://pbs.example/alice.jpg"></div>
        <div data-testid="User-Name">
          <a href="/alice"><span><span>Alice</span></span></a>
          <a href="/alice"><span>@alice</span></a>
          <a href="/alice/status/1001"><time datetime="2024-06-01T10:00:00.000Z">Jun 1</time></a>
        </div>
        <div data-testid="tweetText" lang="fr"><span>Bonjour à tous</span><br><span>deuxième ligne</span></div>
        <div data-testid="tweetPhoto"><img src="https://pbs.example/photo.jpg"></div>
        <div role="group">
          <div data-testid="reply"><span>3</span></div>
          <div data-testid="retweet"><span>1.2K</span></div>
          <div data-testid="like"><span>2.5M</span></div>
        </div>
      </article>
    </div>
    <div data-testid="cellInnerDiv">
      <article data-testid="tweet" role="article">
        <span data-testid="socialContext">Bob reposted</span>
        <div data-testid="User-Name">
          <a href="/carol"><span>Carol</span></a>
          <a href="/carol"><span>@carol</span></a>
          <a href="/carol/status/1002"><time datetime="2024-06-01T09:00:00.000Z">Jun 1</time></a>
        </div>
        <div data-testid="tweetText" lang="es"><span>Hola a todos desde aquí</span></div>
      </article>
    </div>
  </section>
</div>
</body></html>"#;

pub fn parse(html: &str) -> RcDom {
    html_to_dom(html.as_bytes(), "utf-8").expect("解析测试HTML失败")
}

pub fn first_tag(root: &Handle, tag: &str) -> Handle {
    find_descendant(root, |n| get_node_name(n) == Some(tag)).expect("找不到元素")
}

pub fn all_tags(root: &Handle, tag: &str) -> Vec<Handle> {
    find_descendants(root, |n| get_node_name(n) == Some(tag))
}

pub fn with_attr(root: &Handle, name: &str) -> Vec<Handle> {
    find_descendants(root, |n| get_node_attr(n, name).is_some())
}

/// 测试用配置：较短的超时与退避
pub fn fast_config() -> TranslatorConfig {
    TranslatorConfig {
        request_timeout_secs: 1,
        retry_attempts: 2,
        base_backoff_ms: 10,
        ..TranslatorConfig::default()
    }
}

/// 可编程的模拟补全服务
#[derive(Default)]
pub struct MockProvider {
    calls: Cell<usize>,
    replies: RefCell<HashMap<String, String>>,
    failure: RefCell<Option<ProviderFailure>>,
    hang: Cell<bool>,
    delay: Cell<Option<Duration>>,
    requests: RefCell<Vec<TranslationRequest>>,
}

impl MockProvider {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// 为指定原文设置译文，未设置的原文返回 `[target] 原文`
    pub fn reply(self: &Rc<Self>, source: &str, translated: &str) -> Rc<Self> {
        self.replies
            .borrow_mut()
            .insert(source.to_string(), translated.to_string());
        Rc::clone(self)
    }

    pub fn failing(self: &Rc<Self>, failure: ProviderFailure) -> Rc<Self> {
        *self.failure.borrow_mut() = Some(failure);
        Rc::clone(self)
    }

    /// 每次调用都永不返回
    pub fn hanging(self: &Rc<Self>) -> Rc<Self> {
        self.hang.set(true);
        Rc::clone(self)
    }

    /// 每次调用先等待固定时间再返回
    pub fn delayed(self: &Rc<Self>, delay: Duration) -> Rc<Self> {
        self.delay.set(Some(delay));
        Rc::clone(self)
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn requests(&self) -> Vec<TranslationRequest> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl CompletionProvider for MockProvider {
    async fn complete(&self, request: &TranslationRequest) -> Result<Completion, ProviderFailure> {
        self.calls.set(self.calls.get() + 1);
        self.requests.borrow_mut().push(request.clone());

        if self.hang.get() {
            tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
        }
        if let Some(delay) = self.delay.get() {
            tokio::time::sleep(delay).await;
        }

        if let Some(failure) = self.failure.borrow().clone() {
            return Err(failure);
        }

        let translated = self
            .replies
            .borrow()
            .get(&request.source_text)
            .cloned()
            .unwrap_or_else(|| format!("[{}] {}", request.target_lang, request.source_text));

        Ok(Completion {
            tokens_used: translated.chars().count() as u32,
            translated_text: translated,
            detected_lang: Some("en".to_string()),
        })
    }
}

/// 创建使用内存缓存的运行时
pub fn runtime_with(provider: Rc<MockProvider>, config: TranslatorConfig) -> ContentRuntime {
    ContentRuntime::new(config, provider, Rc::new(MemoryCacheStore::new())).expect("创建运行时失败")
}
