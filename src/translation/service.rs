//! 翻译服务
//!
//! 先查缓存，未命中时调用补全服务。每次调用都有超时，可重试的失败按指数退避
//! 加随机抖动自动重试，重试次数有限。

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::Rng;
use serde::Serialize;

use super::config::{constants, TranslatorConfig};
use super::error::{helpers, ErrorStats, TranslatorError, TranslatorResult};
use super::provider::{Completion, CompletionProvider, TranslationRequest};
use super::storage::{generate_cache_key, summarize, CacheEntry, CacheStore, CacheSummary};

/// 翻译响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationResponse {
    pub translated_text: String,
    pub tokens_used: u32,
    pub detected_lang: Option<String>,
    pub from_cache: bool,
}

/// 服务统计
#[derive(Debug, Default)]
pub struct ServiceStats {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    provider_calls: AtomicU64,
    retries: AtomicU64,
    failures: AtomicU64,
    tokens_used: AtomicU64,
}

/// 统计快照
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStatsSnapshot {
    pub requests: u64,
    pub cache_hits: u64,
    pub provider_calls: u64,
    pub retries: u64,
    pub failures: u64,
    pub tokens_used: u64,
}

impl ServiceStats {
    pub fn snapshot(&self) -> ServiceStatsSnapshot {
        ServiceStatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            provider_calls: self.provider_calls.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            tokens_used: self.tokens_used.load(Ordering::Relaxed),
        }
    }
}

/// 翻译服务
pub struct TranslationService {
    provider: Rc<dyn CompletionProvider>,
    cache: Rc<dyn CacheStore>,
    config: RefCell<TranslatorConfig>,
    stats: ServiceStats,
    errors: RefCell<ErrorStats>,
}

impl TranslationService {
    pub fn new(
        provider: Rc<dyn CompletionProvider>,
        cache: Rc<dyn CacheStore>,
        config: TranslatorConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            config: RefCell::new(config),
            stats: ServiceStats::default(),
            errors: RefCell::new(ErrorStats::default()),
        }
    }

    /// 更新运行期配置，已在进行中的请求沿用发起时的配置
    pub fn set_config(&self, config: TranslatorConfig) {
        *self.config.borrow_mut() = config;
    }

    pub fn config(&self) -> TranslatorConfig {
        self.config.borrow().clone()
    }

    pub fn stats(&self) -> ServiceStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn error_stats(&self) -> ErrorStats {
        self.errors.borrow().clone()
    }

    /// 翻译一段文本
    pub async fn translate(&self, request: TranslationRequest) -> TranslatorResult<TranslationResponse> {
        self.stats.requests.fetch_add(1, Ordering::Relaxed);

        if request.source_text.trim().is_empty() {
            return Err(helpers::validation_error("源文本为空"));
        }

        let config = self.config();
        let key = generate_cache_key(&request.source_text, &request.target_lang);

        if config.cache_enabled {
            if let Some(entry) = self.cache.get(&key) {
                tracing::debug!("缓存命中: {}", key);
                self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(TranslationResponse {
                    translated_text: entry.translated_text,
                    tokens_used: entry.tokens_used,
                    detected_lang: entry.detected_lang,
                    from_cache: true,
                });
            }
        }

        let completion = match self.complete_with_retry(&request, &config).await {
            Ok(completion) => completion,
            Err(e) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                self.errors.borrow_mut().record_error(&e);
                helpers::log_error(&e);
                return Err(e);
            }
        };

        self.stats
            .tokens_used
            .fetch_add(u64::from(completion.tokens_used), Ordering::Relaxed);

        if config.cache_enabled {
            let mut entry = CacheEntry::new(
                request.source_text.clone(),
                completion.translated_text.clone(),
                request.source_lang.clone(),
                request.target_lang.clone(),
            )
            .with_ttl(config.cache_ttl());
            entry.detected_lang = completion.detected_lang.clone();
            entry.tokens_used = completion.tokens_used;
            self.cache.set(&key, entry);
        }

        Ok(TranslationResponse {
            translated_text: completion.translated_text,
            tokens_used: completion.tokens_used,
            detected_lang: completion.detected_lang,
            from_cache: false,
        })
    }

    async fn complete_with_retry(
        &self,
        request: &TranslationRequest,
        config: &TranslatorConfig,
    ) -> TranslatorResult<Completion> {
        let timeout = config.request_timeout();
        let mut attempt = 0usize;

        loop {
            let error = match self.complete_once(request, timeout).await {
                Ok(completion) => return Ok(completion),
                Err(error) => error,
            };

            if !error.is_retryable() || attempt >= config.retry_attempts {
                return Err(error);
            }

            let delay = backoff_delay(
                attempt,
                config.base_backoff(),
                config.max_backoff(),
                random_jitter(config.base_backoff()),
            );
            tracing::warn!(
                "翻译请求失败，{:?} 后进行第 {} 次重试: {}",
                delay,
                attempt + 1,
                error
            );
            self.stats.retries.fetch_add(1, Ordering::Relaxed);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn complete_once(
        &self,
        request: &TranslationRequest,
        timeout: Duration,
    ) -> TranslatorResult<Completion> {
        self.stats.provider_calls.fetch_add(1, Ordering::Relaxed);

        // 超时后 future 被丢弃，等同于向补全服务发出中止信号
        let completion = tokio::time::timeout(timeout, self.provider.complete(request))
            .await
            .map_err(|_| helpers::timeout_error(format!("补全请求超过 {:?}", timeout)))??;

        if completion.translated_text.trim().is_empty() {
            return Err(TranslatorError::EmptyTranslation);
        }

        Ok(completion)
    }

    /// 枚举缓存生成概况
    pub fn cache_summary(&self) -> CacheSummary {
        summarize(self.cache.as_ref())
    }

    /// 清空全部翻译缓存
    pub fn clear_cache(&self) -> usize {
        let removed = self.cache.delete_by_prefix(constants::CACHE_KEY_PREFIX);
        tracing::info!("已清除 {} 条翻译缓存", removed);
        removed
    }
}

/// 计算第 `attempt` 次重试前的等待时间：`base * 2^attempt + jitter`，不超过 `max`
pub fn backoff_delay(attempt: usize, base: Duration, max: Duration, jitter: Duration) -> Duration {
    let factor = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
    base.saturating_mul(factor).saturating_add(jitter).min(max)
}

fn random_jitter(base: Duration) -> Duration {
    let upper = base.as_millis().min(u128::from(u64::MAX)) as u64;
    if upper == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=upper))
}
