//! 翻译流程集成测试
//!
//! 缓存命中、超时重试、空译文，以及从点击到界面状态的完整流程

use std::rc::Rc;
use std::time::Duration;

use tokio::time::Instant;

use feed_translator::translation::{
    MemoryCacheStore, ProviderFailure, TranslationRequest, TranslationService, TranslatorError,
};
use feed_translator::UiState;

mod common;

use common::{fast_config, first_tag, parse, runtime_with, with_attr, MockProvider, TIMELINE};

fn service(provider: Rc<MockProvider>) -> (TranslationService, Rc<MemoryCacheStore>) {
    let cache = Rc::new(MemoryCacheStore::new());
    let service = TranslationService::new(provider, cache.clone(), fast_config());
    (service, cache)
}

/// 第二次相同请求由缓存返回，不调用补全服务
#[tokio::test]
async fn test_second_request_served_from_cache() {
    let provider = MockProvider::new().reply("Hello", "你好");
    let (service, cache) = service(provider.clone());

    let first = service
        .translate(TranslationRequest::new("Hello", "zh"))
        .await
        .expect("first translation");
    assert_eq!(first.translated_text, "你好");
    assert!(!first.from_cache);

    let second = service
        .translate(TranslationRequest::new("Hello", "zh"))
        .await
        .expect("second translation");
    assert_eq!(second.translated_text, "你好");
    assert!(second.from_cache);

    assert_eq!(provider.calls(), 1);
    assert_eq!(cache.size(), 1);
    assert_eq!(service.stats().cache_hits, 1);
}

#[tokio::test]
async fn test_cache_key_ignores_whitespace_but_not_language() {
    let provider = MockProvider::new();
    let (service, _) = service(provider.clone());

    service
        .translate(TranslationRequest::new("Hello   world", "zh"))
        .await
        .expect("zh");
    let again = service
        .translate(TranslationRequest::new("  Hello world ", "zh"))
        .await
        .expect("zh again");
    assert!(again.from_cache);

    let japanese = service
        .translate(TranslationRequest::new("Hello world", "ja"))
        .await
        .expect("ja");
    assert!(!japanese.from_cache);
    assert_eq!(provider.calls(), 2);

    let summary = service.cache_summary();
    assert_eq!(summary.entries, 2);
    assert_eq!(service.clear_cache(), 2);
}

/// 超时属于可重试错误，自动重试次数不超过配置值
#[tokio::test(start_paused = true)]
async fn test_timeout_is_retryable_and_bounded() {
    let provider = MockProvider::new().hanging();
    let (service, cache) = service(provider.clone());
    let config = fast_config();

    let started = Instant::now();
    let error = service
        .translate(TranslationRequest::new("Hello", "zh"))
        .await
        .expect_err("should time out");

    assert!(matches!(error, TranslatorError::Timeout(_)));
    assert!(error.is_retryable());
    assert_eq!(provider.calls(), 1 + config.retry_attempts);
    assert_eq!(cache.size(), 0);
    assert!(started.elapsed() >= Duration::from_secs(1 + config.retry_attempts as u64));
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_failure_is_not_retried() {
    let provider = MockProvider::new().failing(ProviderFailure::new("auth", "invalid key", false));
    let (service, _) = service(provider.clone());

    let error = service
        .translate(TranslationRequest::new("Hello", "zh"))
        .await
        .expect_err("should fail");

    assert_eq!(
        error,
        TranslatorError::TranslationFailed {
            code: "auth".to_string(),
            message: "invalid key".to_string(),
            retryable: false,
        }
    );
    assert_eq!(provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retryable_failure_uses_full_budget() {
    let provider = MockProvider::new().failing(ProviderFailure::new("rate_limited", "slow down", true));
    let (service, _) = service(provider.clone());

    let error = service
        .translate(TranslationRequest::new("Hello", "zh"))
        .await
        .expect_err("should fail");

    assert!(error.is_retryable());
    assert_eq!(provider.calls(), 3);
    assert_eq!(service.stats().retries, 2);
    assert_eq!(service.error_stats().total_errors, 1);
}

/// 空白译文视为错误，既不缓存也不显示
#[tokio::test]
async fn test_blank_translation_is_an_error() {
    let provider = MockProvider::new().reply("Hello", "   ");
    let (service, cache) = service(provider.clone());

    for _ in 0..2 {
        let error = service
            .translate(TranslationRequest::new("Hello", "zh"))
            .await
            .expect_err("blank");
        assert_eq!(error, TranslatorError::EmptyTranslation);
    }

    assert_eq!(provider.calls(), 2);
    assert_eq!(cache.size(), 0);
}

#[tokio::test]
async fn test_empty_source_is_rejected() {
    let provider = MockProvider::new();
    let (service, _) = service(provider.clone());

    let error = service
        .translate(TranslationRequest::new("  ", "zh"))
        .await
        .expect_err("empty");
    assert!(matches!(error, TranslatorError::InvalidInput(_)));
    assert_eq!(provider.calls(), 0);
}

/// 点击 → 加载中 → 成功，结果渲染在按钮下方
#[tokio::test]
async fn test_click_to_success() {
    let dom = parse(TIMELINE);
    let provider = MockProvider::new().reply("Bonjour à tous\ndeuxième ligne", "大家好\n第二行");
    let mut runtime = runtime_with(provider.clone(), fast_config());
    runtime.start("https://x.com/home", Instant::now());

    let report = runtime.scan_now(&dom.document);
    assert_eq!(report.injected, 2);

    assert!(runtime.click("1001"));
    assert_eq!(runtime.process_pending().await, 1);
    assert_eq!(runtime.ui_state("1001"), UiState::Success("大家好\n第二行".to_string()));
    assert_eq!(provider.requests()[0].target_lang, "zh");

    let article = first_tag(&dom.document, "article");
    let translated = with_attr(&article, "data-ft-translation");
    assert_eq!(translated.len(), 1);
    assert_eq!(
        feed_translator::dom::text_content(&translated[0]),
        "大家好第二行"
    );

    // 成功后的点击被忽略
    assert!(!runtime.click("1001"));
    assert_eq!(runtime.process_pending().await, 0);
}

/// 超时后界面进入可重试的错误状态，重试再次进入加载流程
#[tokio::test(start_paused = true)]
async fn test_timeout_surfaces_retryable_error_state() {
    let dom = parse(TIMELINE);
    let provider = MockProvider::new().hanging();
    let config = fast_config();
    let mut runtime = runtime_with(provider.clone(), config.clone());
    runtime.start("https://x.com/home", Instant::now());
    runtime.scan_now(&dom.document);

    assert!(runtime.click("1002"));
    runtime.process_pending().await;

    match runtime.ui_state("1002") {
        UiState::Error { retryable, .. } => assert!(retryable),
        other => panic!("unexpected state: {:?}", other),
    }
    assert_eq!(provider.calls(), 1 + config.retry_attempts);

    assert!(runtime.click("1002"));
    runtime.process_pending().await;
    assert_eq!(provider.calls(), 2 * (1 + config.retry_attempts));
}
