//! # Feed Translator
//!
//! 在社交媒体信息流文档中识别帖子、去重，并在正文旁注入内联翻译按钮。
//!
//! ## 模块组织
//!
//! - `dom` - DOM 解析、查询、修改与序列化
//! - `classifier` - 帖子判定与字段提取
//! - `identity` - 帖子标识解析
//! - `tracker` - 已处理集合
//! - `monitor` - 变更监听、候选发现、启动扫描、导航检测
//! - `injection` - 翻译按钮注入与界面状态
//! - `translation` - 翻译服务、缓存、配置与错误
//! - `runtime` - 持有所有组件的运行时上下文
//! - `env` - 环境变量
//! - `logging` - 日志初始化

pub mod classifier;
pub mod dom;
pub mod env;
pub mod identity;
pub mod injection;
pub mod logging;
pub mod monitor;
pub mod runtime;
pub mod tracker;
pub mod translation;

// Re-export commonly used items for convenience
pub use classifier::{classify, Author, MediaItem, MediaKind, Metrics, Post};
pub use identity::{resolve_id, IdSource, ResolvedId};
pub use injection::{InjectOutcome, InjectionController, TranslateIntent, UiState};
pub use monitor::{MutationMonitor, MutationRecord, PassReport, ScanIssue};
pub use runtime::{ContentRuntime, RuntimeEvent, RuntimeStats, TickReport};
pub use tracker::ProcessedTracker;
pub use translation::{TranslatorConfig, TranslatorError, TranslatorResult};
