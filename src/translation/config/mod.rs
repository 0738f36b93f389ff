//! 配置管理模块
//!
//! 支持配置文件、环境变量和默认值，运行期的修改通过 `ConfigStore` 广播

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, ConfigPatch, TranslatorConfig};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 翻译请求
    pub const DEFAULT_TARGET_LANG: &str = "zh";
    pub const DEFAULT_SOURCE_LANG: &str = "auto";
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_RETRY_ATTEMPTS: usize = 3;
    pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(500);
    pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

    // 缓存
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 3600);
    pub const CACHE_KEY_PREFIX: &str = "translation:";

    // 扫描与去重
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);
    pub const DEFAULT_MAX_PROCESSED: usize = 1000;
    pub const DEFAULT_TRIM_INTERVAL: Duration = Duration::from_secs(60);
    pub const DEFAULT_NAVIGATION_POLL: Duration = Duration::from_millis(1000);
    pub const DEFAULT_BOOTSTRAP_DELAYS_MS: &[u64] = &[500, 2000];
    pub const DEFAULT_BOOTSTRAP_BACKOFF: Duration = Duration::from_millis(1000);
    pub const MAX_BOOTSTRAP_RETRIES: usize = 5;
    pub const MAX_DEEP_SCAN_DEPTH: usize = 5;

    // 正文判定
    pub const MIN_SPAN_TEXT_CHARS: usize = 10;

    // DOM 标记
    pub const PROCESSED_ATTR: &str = "data-ft-processed";
    pub const POST_ID_ATTR: &str = "data-ft-post-id";
    pub const UI_ROOT_ATTR: &str = "data-ft-ui";
    pub const UI_RESULT_ATTR: &str = "data-ft-result";
    pub const UI_STATE_ATTR: &str = "data-ft-state";

    pub const DEFAULT_BUTTON_LABEL: &str = "Translate";
    pub const SITE_ORIGIN: &str = "https://x.com";

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "feed-translator.toml",
        ".feed-translator.toml",
        "feed-translator.json",
        "~/.config/feed-translator/config.toml",
        "/etc/feed-translator/config.toml",
    ];
}

/// 是否存在任一配置文件
pub fn config_file_exists() -> bool {
    constants::CONFIG_PATHS
        .iter()
        .any(|path| std::path::Path::new(shellexpand::tilde(path).as_ref()).exists())
}

/// 加载配置，失败时退回默认值
pub fn load_config() -> TranslatorConfig {
    match ConfigManager::new() {
        Ok(manager) => manager.get_config().clone(),
        Err(e) => {
            tracing::warn!("配置加载失败，使用默认配置: {}", e);
            TranslatorConfig::default()
        }
    }
}
