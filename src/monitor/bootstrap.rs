use std::time::Duration;

use markup5ever_rcdom::Handle;
use tokio::time::Instant;

use super::discovery::discover_all;
use crate::translation::config::constants::{MAX_BACKOFF, MAX_BOOTSTRAP_RETRIES};
use crate::translation::config::TranslatorConfig;

/// 启动扫描调度
///
/// 页面加载（或检测到站内导航）后按固定延迟扫描整个文档，固定延迟用完后
/// 以指数退避继续重试，直到某次扫描发现新帖子或重试次数达到上限。
#[derive(Debug)]
pub struct BootstrapScanner {
    delays: Vec<Duration>,
    max_retries: usize,
    backoff: Duration,
    started: Option<Instant>,
    scans: usize,
    next_due: Option<Instant>,
}

impl BootstrapScanner {
    pub fn new(delays: Vec<Duration>, max_retries: usize, backoff: Duration) -> Self {
        Self {
            delays,
            max_retries: max_retries.min(MAX_BOOTSTRAP_RETRIES),
            backoff,
            started: None,
            scans: 0,
            next_due: None,
        }
    }

    pub fn from_config(config: &TranslatorConfig) -> Self {
        Self::new(
            config.bootstrap_delays(),
            config.bootstrap_max_retries,
            config.bootstrap_backoff(),
        )
    }

    /// 重新开始调度，重置重试预算
    pub fn schedule_retries(&mut self, now: Instant) {
        self.started = Some(now);
        self.scans = 0;
        self.next_due = Some(now + self.delays.first().copied().unwrap_or(self.backoff));
        tracing::debug!("启动扫描已调度，固定延迟 {:?}", self.delays);
    }

    /// 下一次扫描的时间
    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_due
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_due.is_some_and(|due| due <= now)
    }

    /// 对整个文档运行所有发现策略
    pub fn scan_once(&mut self, document: &Handle) -> Vec<Handle> {
        self.scans += 1;
        let candidates = discover_all(std::slice::from_ref(document));
        tracing::debug!("第 {} 次启动扫描，候选 {} 个", self.scans, candidates.len());
        candidates
    }

    /// 记录一次扫描的结果并安排下一次
    pub fn record_scan(&mut self, now: Instant, new_posts: usize) {
        let Some(started) = self.started else {
            self.next_due = None;
            return;
        };

        if self.scans < self.delays.len() {
            self.next_due = Some(started + self.delays[self.scans]);
            return;
        }

        let retry = self.scans - self.delays.len();
        if new_posts > 0 || retry >= self.max_retries {
            if new_posts == 0 {
                tracing::info!("启动扫描重试 {} 次后仍未发现帖子，停止", self.max_retries);
            }
            self.next_due = None;
            return;
        }

        let factor = 1u32.checked_shl(retry as u32).unwrap_or(u32::MAX);
        let delay = self.backoff.saturating_mul(factor).min(MAX_BACKOFF);
        self.next_due = Some(now + delay);
    }

    /// 停止调度
    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn scans(&self) -> usize {
        self.scans
    }

    /// 固定延迟之外允许的最多扫描次数
    pub fn max_scans(&self) -> usize {
        self.delays.len() + self.max_retries
    }

    pub fn reconfigure(&mut self, config: &TranslatorConfig) {
        self.delays = config.bootstrap_delays();
        self.max_retries = config.bootstrap_max_retries.min(MAX_BOOTSTRAP_RETRIES);
        self.backoff = config.bootstrap_backoff();
    }
}
