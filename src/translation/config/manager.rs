//! 配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::translation::error::{TranslatorError, TranslatorResult};

/// 翻译与扫描配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslatorConfig {
    // 基础配置
    pub enabled: bool,
    pub target_lang: String,
    pub source_lang: String,

    // 请求配置
    pub request_timeout_secs: u64,
    pub retry_attempts: usize,
    pub base_backoff_ms: u64,
    pub max_backoff_secs: u64,

    // 缓存配置
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,

    // 扫描配置
    pub debounce_ms: u64,
    pub max_processed: usize,
    pub trim_interval_secs: u64,
    pub navigation_poll_ms: u64,
    pub bootstrap_delays_ms: Vec<u64>,
    pub bootstrap_max_retries: usize,
    pub bootstrap_backoff_ms: u64,

    // 界面
    pub button_label: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_lang: constants::DEFAULT_TARGET_LANG.to_string(),
            source_lang: constants::DEFAULT_SOURCE_LANG.to_string(),

            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT.as_secs(),
            retry_attempts: constants::DEFAULT_RETRY_ATTEMPTS,
            base_backoff_ms: constants::DEFAULT_BASE_BACKOFF.as_millis() as u64,
            max_backoff_secs: constants::MAX_BACKOFF.as_secs(),

            cache_enabled: true,
            cache_ttl_secs: constants::DEFAULT_CACHE_TTL.as_secs(),

            debounce_ms: constants::DEFAULT_DEBOUNCE.as_millis() as u64,
            max_processed: constants::DEFAULT_MAX_PROCESSED,
            trim_interval_secs: constants::DEFAULT_TRIM_INTERVAL.as_secs(),
            navigation_poll_ms: constants::DEFAULT_NAVIGATION_POLL.as_millis() as u64,
            bootstrap_delays_ms: constants::DEFAULT_BOOTSTRAP_DELAYS_MS.to_vec(),
            bootstrap_max_retries: constants::MAX_BOOTSTRAP_RETRIES,
            bootstrap_backoff_ms: constants::DEFAULT_BOOTSTRAP_BACKOFF.as_millis() as u64,

            button_label: constants::DEFAULT_BUTTON_LABEL.to_string(),
        }
    }
}

impl TranslatorConfig {
    /// 创建带指定目标语言的默认配置
    pub fn default_with_lang(target_lang: &str) -> Self {
        Self {
            target_lang: target_lang.to_string(),
            ..Self::default()
        }
    }

    /// 验证配置
    pub fn validate(&self) -> TranslatorResult<()> {
        if self.target_lang.trim().is_empty() {
            return Err(TranslatorError::ConfigError("目标语言不能为空".to_string()));
        }

        if self.request_timeout_secs == 0 {
            return Err(TranslatorError::ConfigError("请求超时不能为0".to_string()));
        }

        if self.debounce_ms == 0 {
            return Err(TranslatorError::ConfigError("防抖窗口不能为0".to_string()));
        }

        if self.navigation_poll_ms == 0 {
            return Err(TranslatorError::ConfigError("导航轮询间隔不能为0".to_string()));
        }

        if self.trim_interval_secs == 0 {
            return Err(TranslatorError::ConfigError("淘汰间隔不能为0".to_string()));
        }

        if self.max_processed == 0 {
            return Err(TranslatorError::ConfigError("已处理集合容量不能为0".to_string()));
        }

        if self.bootstrap_max_retries > constants::MAX_BOOTSTRAP_RETRIES {
            return Err(TranslatorError::ConfigError(format!(
                "启动扫描重试次数不能超过{}",
                constants::MAX_BOOTSTRAP_RETRIES
            )));
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{cache, scan, translation, EnvVar};

        if let Ok(enabled) = translation::Enabled::get() {
            self.enabled = enabled;
        }

        if let Ok(target_lang) = translation::TargetLang::get() {
            tracing::info!("环境变量覆盖目标语言: {}", target_lang);
            self.target_lang = target_lang;
        }

        if let Ok(source_lang) = translation::SourceLang::get() {
            self.source_lang = source_lang;
        }

        if let Ok(timeout) = translation::RequestTimeout::get() {
            self.request_timeout_secs = timeout.as_secs();
        }

        if let Ok(attempts) = translation::RetryAttempts::get() {
            self.retry_attempts = attempts;
        }

        if let Ok(cache_enabled) = cache::Enabled::get() {
            self.cache_enabled = cache_enabled;
        }

        if let Ok(ttl) = cache::Ttl::get() {
            self.cache_ttl_secs = ttl.as_secs();
        }

        if let Ok(debounce) = scan::DebounceMs::get() {
            self.debounce_ms = debounce;
        }

        if let Ok(max_processed) = scan::MaxProcessed::get() {
            self.max_processed = max_processed;
        }
    }

    /// 合并部分更新
    pub fn apply_patch(&mut self, patch: &ConfigPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(ref lang) = patch.target_lang {
            self.target_lang = lang.clone();
        }
        if let Some(ref lang) = patch.source_lang {
            self.source_lang = lang.clone();
        }
        if let Some(secs) = patch.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(attempts) = patch.retry_attempts {
            self.retry_attempts = attempts;
        }
        if let Some(cache_enabled) = patch.cache_enabled {
            self.cache_enabled = cache_enabled;
        }
        if let Some(ttl) = patch.cache_ttl_secs {
            self.cache_ttl_secs = ttl;
        }
        if let Some(debounce) = patch.debounce_ms {
            self.debounce_ms = debounce;
        }
        if let Some(max_processed) = patch.max_processed {
            self.max_processed = max_processed;
        }
        if let Some(ref label) = patch.button_label {
            self.button_label = label.clone();
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs).min(constants::MAX_BACKOFF)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn trim_interval(&self) -> Duration {
        Duration::from_secs(self.trim_interval_secs)
    }

    pub fn navigation_poll(&self) -> Duration {
        Duration::from_millis(self.navigation_poll_ms)
    }

    pub fn bootstrap_delays(&self) -> Vec<Duration> {
        self.bootstrap_delays_ms
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect()
    }

    pub fn bootstrap_backoff(&self) -> Duration {
        Duration::from_millis(self.bootstrap_backoff_ms)
    }
}

/// 配置的部分更新
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ConfigPatch {
    pub enabled: Option<bool>,
    pub target_lang: Option<String>,
    pub source_lang: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub retry_attempts: Option<usize>,
    pub cache_enabled: Option<bool>,
    pub cache_ttl_secs: Option<u64>,
    pub debounce_ms: Option<u64>,
    pub max_processed: Option<usize>,
    pub button_label: Option<String>,
}

/// 配置管理器
pub struct ConfigManager {
    config: TranslatorConfig,
}

impl ConfigManager {
    /// 按搜索路径加载配置并应用环境变量覆盖
    pub fn new() -> TranslatorResult<Self> {
        let mut config = Self::load_config()?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 从指定文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> TranslatorResult<Self> {
        let mut config = Self::load_from_file(path.as_ref())?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 获取配置
    pub fn get_config(&self) -> &TranslatorConfig {
        &self.config
    }

    fn load_config() -> TranslatorResult<TranslatorConfig> {
        Self::load_dotenv();

        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(Path::new(expanded_path.as_ref()));
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(TranslatorConfig::default())
    }

    fn load_from_file(path: &Path) -> TranslatorResult<TranslatorConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TranslatorError::ConfigError(format!("读取配置文件失败: {}", e)))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(&content)
                .map_err(|e| TranslatorError::ConfigError(format!("解析JSON配置失败: {}", e)))
        } else {
            toml::from_str(&content)
                .map_err(|e| TranslatorError::ConfigError(format!("解析TOML配置失败: {}", e)))
        }
    }

    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config<P: AsRef<Path>>(path: P) -> TranslatorResult<()> {
        let config = TranslatorConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| TranslatorError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslatorError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}
