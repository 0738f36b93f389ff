//! 内容脚本运行时
//!
//! `ContentRuntime` 是显式的上下文对象，持有所有组件，不依赖任何全局状态，
//! 同一进程中可以并存多个互不影响的实例。
//!
//! 运行时有两种驱动方式：
//!
//! - 同步：宿主自行调用 `on_mutations` / `tick` / `click`，再 `process_pending().await`
//! - 异步：`run` 在单线程上用 `tokio::select!` 等待变更通知、各计时器和进行中的翻译
//!
//! 翻译请求是唯一的挂起点。每个请求都是独立的 future，放在 `FuturesUnordered` 中并发推进，
//! 结果回到驱动循环后再更新界面，请求进行期间扫描与导航检测照常运行。

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use futures::future::{FutureExt, LocalBoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use markup5ever_rcdom::Handle;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use crate::injection::{InjectionController, TranslateCallback, TranslateIntent, UiState};
use crate::monitor::{
    discover_all, BootstrapScanner, MonitorStats, MutationMonitor, MutationRecord, NavigationWatcher,
    PassReport,
};
use crate::tracker::ProcessedTracker;
use crate::translation::config::TranslatorConfig;
use crate::translation::provider::{CompletionProvider, TranslationRequest};
use crate::translation::service::{ServiceStatsSnapshot, TranslationResponse, TranslationService};
use crate::translation::storage::{CacheStore, CacheSummary, ConfigStore};
use crate::translation::TranslatorResult;

/// 宿主环境送来的事件
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    Mutations(Vec<MutationRecord>),
    Click(String),
}

/// 一个进行中的翻译请求，完成时带回帖子标识
type InFlight = LocalBoxFuture<'static, (String, TranslatorResult<TranslationResponse>)>;

enum DriverStep {
    Event(RuntimeEvent),
    Tick,
    Finished(String, TranslatorResult<TranslationResponse>),
}

/// 一次 `tick` 的结果
#[derive(Debug, Default)]
pub struct TickReport {
    pub navigated: bool,
    pub mutation_pass: Option<PassReport>,
    pub bootstrap_pass: Option<PassReport>,
    pub evicted: usize,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        !self.navigated
            && self.mutation_pass.is_none()
            && self.bootstrap_pass.is_none()
            && self.evicted == 0
    }
}

/// 运行时统计快照
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuntimeStats {
    pub monitor: MonitorStats,
    pub service: ServiceStatsSnapshot,
    pub bootstrap_scans: usize,
    pub resets: usize,
    pub evicted: usize,
    pub processed: usize,
    pub ui_slots: usize,
}

/// 内容脚本运行时
pub struct ContentRuntime {
    config: TranslatorConfig,
    tracker: ProcessedTracker,
    monitor: MutationMonitor,
    scanner: BootstrapScanner,
    navigation: NavigationWatcher,
    injector: InjectionController,
    service: Rc<TranslationService>,
    queue: Rc<RefCell<VecDeque<TranslateIntent>>>,
    on_translate: TranslateCallback,
    pending_config: Rc<RefCell<Option<TranslatorConfig>>>,
    next_trim: Option<Instant>,
    bootstrap_scans: usize,
    resets: usize,
    evicted: usize,
}

impl ContentRuntime {
    pub fn new(
        config: TranslatorConfig,
        provider: Rc<dyn CompletionProvider>,
        cache: Rc<dyn CacheStore>,
    ) -> TranslatorResult<Self> {
        config.validate()?;

        let queue: Rc<RefCell<VecDeque<TranslateIntent>>> = Rc::new(RefCell::new(VecDeque::new()));
        let sink = Rc::clone(&queue);
        let on_translate: TranslateCallback = Rc::new(move |intent: &TranslateIntent| {
            sink.borrow_mut().push_back(intent.clone());
        });

        Ok(Self {
            tracker: ProcessedTracker::new(config.max_processed),
            monitor: MutationMonitor::new(config.debounce()),
            scanner: BootstrapScanner::from_config(&config),
            navigation: NavigationWatcher::new(config.navigation_poll()),
            injector: InjectionController::new(config.button_label.clone()),
            service: Rc::new(TranslationService::new(provider, cache, config.clone())),
            queue,
            on_translate,
            pending_config: Rc::new(RefCell::new(None)),
            next_trim: None,
            bootstrap_scans: 0,
            resets: 0,
            evicted: 0,
            config,
        })
    }

    /// 开始监听并安排启动扫描
    pub fn start(&mut self, url: &str, now: Instant) {
        if !self.config.enabled {
            tracing::info!("翻译功能已禁用，运行时不启动");
            return;
        }

        self.monitor.start();
        self.navigation.start(url, now);
        self.scanner.schedule_retries(now);
        self.next_trim = Some(now + self.config.trim_interval());
        tracing::info!("运行时已启动: {}", url);
    }

    /// 接收一批变更通知
    pub fn on_mutations(&mut self, records: Vec<MutationRecord>, now: Instant) {
        self.monitor.observe(records, now);
    }

    /// 推进所有计时器
    ///
    /// 顺序：配置变更 → 导航检测 → 防抖扫描 → 启动扫描 → 定期淘汰。
    pub fn tick(&mut self, document: &Handle, url: &str, now: Instant) -> TickReport {
        let mut report = TickReport::default();

        let pending = self.pending_config.borrow_mut().take();
        if let Some(config) = pending {
            if let Err(e) = self.apply_config(config) {
                tracing::warn!("忽略无效的配置变更: {}", e);
            }
        }

        if self.navigation.is_due(now) && self.navigation.check(url, now) {
            self.handle_navigation(document, now);
            report.navigated = true;
        }

        if let Some(candidates) = self.monitor.poll(now) {
            report.mutation_pass = Some(self.monitor.run_pass(
                &candidates,
                &mut self.tracker,
                &mut self.injector,
                &self.on_translate,
            ));
        }

        if self.scanner.is_due(now) {
            let candidates = self.scanner.scan_once(document);
            let pass = self.monitor.run_pass(
                &candidates,
                &mut self.tracker,
                &mut self.injector,
                &self.on_translate,
            );
            self.bootstrap_scans += 1;
            self.scanner.record_scan(now, pass.posts.len());
            report.bootstrap_pass = Some(pass);
        }

        if self.next_trim.is_some_and(|due| due <= now) {
            report.evicted = self.trim();
            self.next_trim = Some(now + self.config.trim_interval());
        }

        report
    }

    fn handle_navigation(&mut self, document: &Handle, now: Instant) {
        self.tracker.reset(document);
        let removed = self.injector.reset();
        self.scanner.schedule_retries(now);
        self.resets += 1;
        tracing::info!("导航后重置：移除 {} 个翻译界面，重新安排启动扫描", removed);
    }

    /// 立即淘汰超出上限的记录
    pub fn trim(&mut self) -> usize {
        let evicted = self.tracker.trim_to_limit();
        let pruned = self.injector.prune_detached();
        self.evicted += evicted;
        if evicted > 0 || pruned > 0 {
            tracing::debug!("定期淘汰: 标识 {}，界面 {}", evicted, pruned);
        }
        evicted
    }

    /// 立即对整个文档扫描一次，不影响启动扫描调度
    pub fn scan_now(&mut self, document: &Handle) -> PassReport {
        let candidates = discover_all(std::slice::from_ref(document));
        self.monitor.run_pass(
            &candidates,
            &mut self.tracker,
            &mut self.injector,
            &self.on_translate,
        )
    }

    /// 用户点击某个帖子的翻译按钮
    pub fn click(&mut self, id: &str) -> bool {
        self.injector.click(id)
    }

    /// 并发处理排队的翻译请求，全部完成后返回发起的请求数
    pub async fn process_pending(&mut self) -> usize {
        let mut in_flight: FuturesUnordered<InFlight> = self.start_queued().into_iter().collect();
        let started = in_flight.len();

        while let Some((id, result)) = in_flight.next().await {
            self.finish_translation(&id, result);
        }

        started
    }

    /// 为排队的点击发起翻译，界面先切换到加载状态
    fn start_queued(&mut self) -> Vec<InFlight> {
        let intents: Vec<TranslateIntent> = self.queue.borrow_mut().drain(..).collect();
        intents
            .into_iter()
            .filter_map(|intent| self.start_translation(intent))
            .collect()
    }

    fn start_translation(&mut self, intent: TranslateIntent) -> Option<InFlight> {
        if !self.injector.show_loading(&intent.post_id) {
            return None;
        }

        let request = TranslationRequest::new(intent.text, self.config.target_lang.clone())
            .with_source_lang(self.config.source_lang.clone());
        let service = Rc::clone(&self.service);
        let id = intent.post_id;
        tracing::debug!("发起翻译: {}", id);

        Some(
            async move {
                let result = service.translate(request).await;
                (id, result)
            }
            .boxed_local(),
        )
    }

    fn finish_translation(&mut self, id: &str, result: TranslatorResult<TranslationResponse>) {
        // 导航重置后同一标识可能已换成新界面，只更新仍在等待结果的界面
        if self.injector.state(id) != UiState::Loading {
            tracing::debug!("帖子 {} 不在加载状态，丢弃翻译结果", id);
            return;
        }

        let shown = match result {
            Ok(response) => self.injector.show_result(id, &response.translated_text),
            Err(e) => self.injector.show_error(id, &e.to_string(), e.is_retryable()),
        };
        if !shown {
            tracing::debug!("帖子 {} 的界面已不存在，丢弃翻译结果", id);
        }
    }

    /// 订阅配置存储，变更在下一次 `tick` 时生效
    pub fn watch_config(&mut self, store: &dyn ConfigStore) {
        let pending = Rc::clone(&self.pending_config);
        store.on_change(Box::new(move |config: &TranslatorConfig| {
            *pending.borrow_mut() = Some(config.clone());
        }));
    }

    /// 应用新配置
    pub fn apply_config(&mut self, config: TranslatorConfig) -> TranslatorResult<()> {
        config.validate()?;

        self.tracker.set_max(config.max_processed);
        self.monitor.set_debounce(config.debounce());
        self.scanner.reconfigure(&config);
        self.navigation.set_interval(config.navigation_poll());
        self.injector.set_button_label(config.button_label.clone());
        self.service.set_config(config.clone());
        self.config = config;

        tracing::debug!("运行时配置已更新");
        Ok(())
    }

    /// 最近的计时器到期时间
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.monitor.next_deadline(),
            self.scanner.next_deadline(),
            self.navigation.next_deadline(),
            self.next_trim,
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// 异步驱动，事件通道关闭（页面卸载）时返回，未完成的翻译随之取消
    pub async fn run<F>(&mut self, document: Handle, url_source: F, mut events: mpsc::Receiver<RuntimeEvent>)
    where
        F: Fn() -> String,
    {
        self.start(&url_source(), Instant::now());
        let mut in_flight: FuturesUnordered<InFlight> = FuturesUnordered::new();

        loop {
            let deadline = self
                .next_deadline()
                .unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            let step = tokio::select! {
                event = events.recv() => match event {
                    Some(event) => DriverStep::Event(event),
                    None => break,
                },
                _ = sleep_until(deadline) => DriverStep::Tick,
                Some((id, result)) = in_flight.next(), if !in_flight.is_empty() => {
                    DriverStep::Finished(id, result)
                }
            };

            match step {
                DriverStep::Event(RuntimeEvent::Mutations(records)) => {
                    self.on_mutations(records, Instant::now());
                }
                DriverStep::Event(RuntimeEvent::Click(id)) => {
                    self.click(&id);
                }
                DriverStep::Tick => {
                    self.tick(&document, &url_source(), Instant::now());
                }
                DriverStep::Finished(id, result) => self.finish_translation(&id, result),
            }

            in_flight.extend(self.start_queued());
        }

        if !in_flight.is_empty() {
            tracing::debug!("取消 {} 个未完成的翻译请求", in_flight.len());
        }
        tracing::info!("事件通道已关闭，运行时停止");
    }

    pub fn ui_state(&self, id: &str) -> UiState {
        self.injector.state(id)
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn tracker(&self) -> &ProcessedTracker {
        &self.tracker
    }

    pub fn service(&self) -> &TranslationService {
        &self.service
    }

    pub fn cache_summary(&self) -> CacheSummary {
        self.service.cache_summary()
    }

    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            monitor: self.monitor.stats(),
            service: self.service.stats(),
            bootstrap_scans: self.bootstrap_scans,
            resets: self.resets,
            evicted: self.evicted,
            processed: self.tracker.len(),
            ui_slots: self.injector.len(),
        }
    }
}
