//! 日志初始化

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::env::{core::LogLevel, EnvVar};

/// 默认日志级别
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// 确定日志过滤规则：`RUST_LOG` 优先，其次 `FEED_TRANSLATOR_LOG_LEVEL`，最后是参数
pub fn resolve_filter(level: Option<&str>) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let level = LogLevel::get()
        .ok()
        .or_else(|| level.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

    EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

/// 安装全局日志订阅者，重复调用时返回 false
pub fn init_logging(level: Option<&str>) -> bool {
    tracing_subscriber::registry()
        .with(resolve_filter(level))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}
