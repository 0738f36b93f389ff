//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    /// 未设置时返回错误，调用方据此决定是否覆盖配置
    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => Err(EnvError {
                variable: Self::NAME.to_string(),
                message: "Environment variable not set".to_string(),
            }),
        }
    }
}

fn parse_bool(value: &str, name: &str) -> EnvResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(EnvError {
            variable: name.to_string(),
            message: format!("Invalid boolean '{}'. Use: true/false, 1/0, yes/no, on/off", value),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, name: &str) -> EnvResult<T> {
    value.trim().parse::<T>().map_err(|_| EnvError {
        variable: name.to_string(),
        message: format!("Invalid number '{}'", value),
    })
}

fn parse_lang(value: &str, name: &str, allow_auto: bool) -> EnvResult<String> {
    let lang = value.trim().to_lowercase();
    let valid = if lang == "auto" {
        allow_auto
    } else {
        (2..=8).contains(&lang.len()) && lang.chars().all(|c| c.is_ascii_alphabetic() || c == '-')
    };
    if valid {
        Ok(lang)
    } else {
        Err(EnvError {
            variable: name.to_string(),
            message: format!("Invalid language code '{}'", value),
        })
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "FEED_TRANSLATOR_LOG_LEVEL";
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }
}

/// 翻译相关环境变量
pub mod translation {
    use super::*;

    /// 翻译功能启用状态
    pub struct Enabled;
    impl EnvVar<bool> for Enabled {
        const NAME: &'static str = "FEED_TRANSLATOR_ENABLED";
        const DESCRIPTION: &'static str = "Enable translation affordances";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// 目标语言
    pub struct TargetLang;
    impl EnvVar<String> for TargetLang {
        const NAME: &'static str = "FEED_TRANSLATOR_TARGET_LANG";
        const DESCRIPTION: &'static str = "Target language for translation (e.g. zh, en, pt-br)";

        fn parse(value: &str) -> EnvResult<String> {
            parse_lang(value, Self::NAME, false)
        }
    }

    /// 源语言
    pub struct SourceLang;
    impl EnvVar<String> for SourceLang {
        const NAME: &'static str = "FEED_TRANSLATOR_SOURCE_LANG";
        const DESCRIPTION: &'static str = "Source language for translation ('auto' for detection)";

        fn parse(value: &str) -> EnvResult<String> {
            parse_lang(value, Self::NAME, true)
        }
    }

    /// 单次请求超时
    pub struct RequestTimeout;
    impl EnvVar<Duration> for RequestTimeout {
        const NAME: &'static str = "FEED_TRANSLATOR_REQUEST_TIMEOUT";
        const DESCRIPTION: &'static str = "Completion request timeout in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let secs: u64 = parse_number(value, Self::NAME)?;
            if secs == 0 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Timeout must be greater than 0".to_string(),
                });
            }
            Ok(Duration::from_secs(secs))
        }
    }

    /// 自动重试次数
    pub struct RetryAttempts;
    impl EnvVar<usize> for RetryAttempts {
        const NAME: &'static str = "FEED_TRANSLATOR_RETRY_ATTEMPTS";
        const DESCRIPTION: &'static str = "Automatic retries after a retryable failure";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_number(value, Self::NAME)
        }
    }
}

/// 缓存相关环境变量
pub mod cache {
    use super::*;

    /// 缓存启用状态
    pub struct Enabled;
    impl EnvVar<bool> for Enabled {
        const NAME: &'static str = "FEED_TRANSLATOR_CACHE_ENABLED";
        const DESCRIPTION: &'static str = "Enable translation result caching";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// 缓存 TTL
    pub struct Ttl;
    impl EnvVar<Duration> for Ttl {
        const NAME: &'static str = "FEED_TRANSLATOR_CACHE_TTL";
        const DESCRIPTION: &'static str = "Cache entry lifetime in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            parse_number(value, Self::NAME).map(Duration::from_secs)
        }
    }
}

/// 扫描相关环境变量
pub mod scan {
    use super::*;

    /// 防抖窗口
    pub struct DebounceMs;
    impl EnvVar<u64> for DebounceMs {
        const NAME: &'static str = "FEED_TRANSLATOR_DEBOUNCE_MS";
        const DESCRIPTION: &'static str = "Mutation debounce window in milliseconds";

        fn parse(value: &str) -> EnvResult<u64> {
            parse_number(value, Self::NAME)
        }
    }

    /// 已处理集合容量
    pub struct MaxProcessed;
    impl EnvVar<usize> for MaxProcessed {
        const NAME: &'static str = "FEED_TRANSLATOR_MAX_PROCESSED";
        const DESCRIPTION: &'static str = "Capacity of the processed post id set";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_number(value, Self::NAME)
        }
    }
}

/// 所有已知环境变量的名称和说明
pub fn documented_variables() -> Vec<(&'static str, &'static str)> {
    vec![
        (core::LogLevel::NAME, core::LogLevel::DESCRIPTION),
        (translation::Enabled::NAME, translation::Enabled::DESCRIPTION),
        (translation::TargetLang::NAME, translation::TargetLang::DESCRIPTION),
        (translation::SourceLang::NAME, translation::SourceLang::DESCRIPTION),
        (translation::RequestTimeout::NAME, translation::RequestTimeout::DESCRIPTION),
        (translation::RetryAttempts::NAME, translation::RetryAttempts::DESCRIPTION),
        (cache::Enabled::NAME, cache::Enabled::DESCRIPTION),
        (cache::Ttl::NAME, cache::Ttl::DESCRIPTION),
        (scan::DebounceMs::NAME, scan::DebounceMs::DESCRIPTION),
        (scan::MaxProcessed::NAME, scan::MaxProcessed::DESCRIPTION),
    ]
}
