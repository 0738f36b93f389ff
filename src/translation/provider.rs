//! 补全服务接口
//!
//! HTTP 客户端、提示词和模型选择都在外部实现，核心只依赖这里的请求/响应契约。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::ProviderFailure;

/// 翻译请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub source_text: String,
    /// 源语言代码，`auto` 表示自动检测
    pub source_lang: String,
    pub target_lang: String,
}

impl TranslationRequest {
    pub fn new(source_text: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            source_text: source_text.into(),
            source_lang: "auto".to_string(),
            target_lang: target_lang.into(),
        }
    }

    pub fn with_source_lang(mut self, source_lang: impl Into<String>) -> Self {
        self.source_lang = source_lang.into();
        self
    }
}

/// 补全服务的一次成功响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub translated_text: String,
    pub tokens_used: u32,
    pub detected_lang: Option<String>,
}

/// 补全服务
///
/// 内容脚本是单线程的，实现不需要 `Send`。调用方以丢弃 future 的方式中止请求。
#[async_trait(?Send)]
pub trait CompletionProvider {
    async fn complete(&self, request: &TranslationRequest) -> Result<Completion, ProviderFailure>;
}
