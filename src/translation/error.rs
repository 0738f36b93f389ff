//! 翻译模块统一错误处理
//!
//! 只有翻译请求路径会向界面层返回类型化错误；分类、提取、注入的失败都降级为
//! `ScanIssue`，见 `monitor` 模块。

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 翻译错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslatorError {
    /// 补全服务返回的失败
    #[error("翻译失败 [{code}]: {message}")]
    TranslationFailed {
        code: String,
        message: String,
        retryable: bool,
    },

    /// 超时错误，总是可重试
    #[error("操作超时: {0}")]
    Timeout(String),

    /// 补全服务返回空白译文
    #[error("翻译结果为空")]
    EmptyTranslation,

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 缓存错误
    #[error("缓存错误: {0}")]
    CacheError(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 节点在处理过程中被移出文档
    #[error("节点已脱离文档")]
    DetachedNode,

    /// 内部错误
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl TranslatorError {
    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslatorError::TranslationFailed { retryable, .. } => *retryable,
            TranslatorError::Timeout(_) => true,
            TranslatorError::CacheError(_) => true,
            TranslatorError::EmptyTranslation => false,
            TranslatorError::InvalidInput(_) => false,
            TranslatorError::ConfigError(_) => false,
            TranslatorError::ParseError(_) => false,
            TranslatorError::DetachedNode => false,
            TranslatorError::InternalError(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslatorError::TranslationFailed { retryable: true, .. } => ErrorSeverity::Warning,
            TranslatorError::TranslationFailed { retryable: false, .. } => ErrorSeverity::Error,
            TranslatorError::Timeout(_) => ErrorSeverity::Warning,
            TranslatorError::EmptyTranslation => ErrorSeverity::Warning,
            TranslatorError::InvalidInput(_) => ErrorSeverity::Info,
            TranslatorError::ConfigError(_) => ErrorSeverity::Critical,
            TranslatorError::CacheError(_) => ErrorSeverity::Warning,
            TranslatorError::ParseError(_) => ErrorSeverity::Error,
            TranslatorError::DetachedNode => ErrorSeverity::Info,
            TranslatorError::InternalError(_) => ErrorSeverity::Critical,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslatorError::TranslationFailed { .. } => ErrorCategory::Service,
            TranslatorError::Timeout(_) => ErrorCategory::Timeout,
            TranslatorError::EmptyTranslation => ErrorCategory::Service,
            TranslatorError::InvalidInput(_) => ErrorCategory::Input,
            TranslatorError::ConfigError(_) => ErrorCategory::Configuration,
            TranslatorError::CacheError(_) => ErrorCategory::Cache,
            TranslatorError::ParseError(_) => ErrorCategory::Parsing,
            TranslatorError::DetachedNode => ErrorCategory::Dom,
            TranslatorError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(mut self, context: T) -> Self {
        let append = |msg: &mut String| *msg = format!("{} (上下文: {})", msg, context);

        match &mut self {
            TranslatorError::TranslationFailed { message, .. } => append(message),
            TranslatorError::Timeout(msg)
            | TranslatorError::InvalidInput(msg)
            | TranslatorError::ConfigError(msg)
            | TranslatorError::CacheError(msg)
            | TranslatorError::ParseError(msg)
            | TranslatorError::InternalError(msg) => append(msg),
            TranslatorError::EmptyTranslation | TranslatorError::DetachedNode => {}
        }

        self
    }
}

/// 补全服务返回的类型化失败
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl ProviderFailure {
    pub fn new(code: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<ProviderFailure> for TranslatorError {
    fn from(failure: ProviderFailure) -> Self {
        TranslatorError::TranslationFailed {
            code: failure.code,
            message: failure.message,
            retryable: failure.retryable,
        }
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Cache,
    Service,
    Timeout,
    Parsing,
    Dom,
    Internal,
}

/// 标准错误转换
impl From<std::io::Error> for TranslatorError {
    fn from(error: std::io::Error) -> Self {
        TranslatorError::InternalError(format!("IO错误: {}", error))
    }
}

impl From<serde_json::Error> for TranslatorError {
    fn from(error: serde_json::Error) -> Self {
        TranslatorError::ParseError(format!("JSON解析错误: {}", error))
    }
}

impl From<toml::de::Error> for TranslatorError {
    fn from(error: toml::de::Error) -> Self {
        TranslatorError::ParseError(format!("TOML解析错误: {}", error))
    }
}

impl From<tokio::time::error::Elapsed> for TranslatorError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        TranslatorError::Timeout(format!("异步操作超时: {}", error))
    }
}

/// 错误结果类型别名
pub type TranslatorResult<T> = Result<T, TranslatorError>;

/// 错误统计信息
#[derive(Debug, Clone, Default)]
pub struct ErrorStats {
    pub total_errors: usize,
    pub by_category: std::collections::HashMap<ErrorCategory, usize>,
    pub by_severity: std::collections::HashMap<ErrorSeverity, usize>,
    pub retryable_errors: usize,
    pub critical_errors: usize,
}

impl ErrorStats {
    /// 记录错误
    pub fn record_error(&mut self, error: &TranslatorError) {
        self.total_errors += 1;

        *self.by_category.entry(error.category()).or_insert(0) += 1;

        let severity = error.severity();
        *self.by_severity.entry(severity).or_insert(0) += 1;

        if error.is_retryable() {
            self.retryable_errors += 1;
        }

        if severity == ErrorSeverity::Critical {
            self.critical_errors += 1;
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Default::default();
    }

    /// 获取错误率
    pub fn error_rate(&self, total_operations: usize) -> f64 {
        if total_operations == 0 {
            0.0
        } else {
            self.total_errors as f64 / total_operations as f64
        }
    }
}

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误
    pub fn log_error(error: &TranslatorError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("翻译信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("翻译警告: {}", error),
            ErrorSeverity::Error => tracing::error!("翻译错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("翻译严重错误: {}", error),
        }
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> TranslatorError {
        TranslatorError::ConfigError(msg.to_string())
    }

    /// 创建输入验证错误
    pub fn validation_error<T: fmt::Display>(msg: T) -> TranslatorError {
        TranslatorError::InvalidInput(msg.to_string())
    }

    /// 创建超时错误
    pub fn timeout_error<T: fmt::Display>(msg: T) -> TranslatorError {
        TranslatorError::Timeout(msg.to_string())
    }
}
