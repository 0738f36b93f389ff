//! 翻译模块
//!
//! - **config**: 配置加载、验证和部分更新
//! - **error**: 错误类型和处理机制
//! - **provider**: 外部补全服务的请求/响应契约
//! - **storage**: 缓存存储和配置存储
//! - **service**: 缓存优先、带超时与有限重试的翻译服务
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use std::rc::Rc;
//! use feed_translator::translation::{
//!     MemoryCacheStore, TranslationRequest, TranslationService, TranslatorConfig,
//! };
//! # use feed_translator::translation::{Completion, CompletionProvider, ProviderFailure};
//! # struct Echo;
//! # #[async_trait::async_trait(?Send)]
//! # impl CompletionProvider for Echo {
//! #     async fn complete(&self, r: &TranslationRequest) -> Result<Completion, ProviderFailure> {
//! #         Ok(Completion { translated_text: r.source_text.clone(), tokens_used: 1, detected_lang: None })
//! #     }
//! # }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = TranslationService::new(
//!     Rc::new(Echo),
//!     Rc::new(MemoryCacheStore::new()),
//!     TranslatorConfig::default_with_lang("zh"),
//! );
//! let response = service.translate(TranslationRequest::new("Hello", "zh")).await?;
//! println!("{} (cache: {})", response.translated_text, response.from_cache);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod provider;
pub mod service;
pub mod storage;

pub use config::{constants, ConfigManager, ConfigPatch, TranslatorConfig};
pub use error::{
    ErrorCategory, ErrorSeverity, ErrorStats, ProviderFailure, TranslatorError, TranslatorResult,
};
pub use provider::{Completion, CompletionProvider, TranslationRequest};
pub use service::{backoff_delay, ServiceStatsSnapshot, TranslationResponse, TranslationService};
pub use storage::{
    generate_cache_key, CacheEntry, CacheStats, CacheStore, ConfigStore, MemoryCacheStore,
    MemoryConfigStore,
};
