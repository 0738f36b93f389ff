//! 变更监听与扫描
//!
//! - `debounce`: 合并短时间内到达的变更批次
//! - `discovery`: 从新增节点出发寻找候选容器
//! - `bootstrap`: 页面加载与导航后的全量扫描调度
//! - `navigation`: 站内导航检测
//!
//! 一次扫描（pass）是同步的：候选按文档顺序逐个处理，单个节点的失败只记录为
//! `ScanIssue`，不会中断整个扫描。

pub mod bootstrap;
pub mod debounce;
pub mod discovery;
pub mod navigation;

use std::time::Duration;

use markup5ever_rcdom::Handle;
use serde::Serialize;
use tokio::time::Instant;

use crate::classifier::{classify, Post};
use crate::injection::{InjectOutcome, InjectionController, TranslateCallback};
use crate::tracker::ProcessedTracker;
use crate::translation::error::{TranslatorError, TranslatorResult};

pub use bootstrap::BootstrapScanner;
pub use debounce::Debouncer;
pub use discovery::{discover, discover_all, DISCOVERY_STRATEGIES};
pub use navigation::NavigationWatcher;

/// 一条子树插入通知
#[derive(Debug, Clone, Default)]
pub struct MutationRecord {
    pub added_nodes: Vec<Handle>,
}

impl MutationRecord {
    pub fn new(added_nodes: Vec<Handle>) -> Self {
        Self { added_nodes }
    }
}

/// 监听状态，页面存续期间没有终止状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Observing,
}

/// 扫描中的非致命结果
#[derive(Debug, Clone, PartialEq)]
pub enum ScanIssue {
    /// 节点不是帖子，属于预期情况
    ClassificationMiss,
    /// 帖子已识别，但部分字段使用了回退值
    ExtractionDegraded {
        id: String,
        missing: Vec<&'static str>,
    },
    /// 找不到可用的注入锚点
    InjectionSkipped { id: String, reason: String },
    /// 处理单个节点时出错
    NodeFailed { error: TranslatorError },
}

/// 一次扫描的汇总
#[derive(Debug, Default)]
pub struct PassReport {
    pub candidates: usize,
    pub skipped_marked: usize,
    pub injected: usize,
    pub posts: Vec<Post>,
    pub issues: Vec<ScanIssue>,
}

impl PassReport {
    pub fn misses(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| matches!(issue, ScanIssue::ClassificationMiss))
            .count()
    }

    pub fn failures(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| matches!(issue, ScanIssue::NodeFailed { .. }))
            .count()
    }

    pub fn merge(&mut self, other: PassReport) {
        self.candidates += other.candidates;
        self.skipped_marked += other.skipped_marked;
        self.injected += other.injected;
        self.posts.extend(other.posts);
        self.issues.extend(other.issues);
    }
}

/// 监听统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    pub batches: usize,
    pub passes: usize,
    pub candidates: usize,
    pub posts: usize,
    pub injected: usize,
    pub skipped_marked: usize,
    pub failures: usize,
}

enum CandidateOutcome {
    Marked,
    Miss,
    Post(Post, Vec<ScanIssue>, bool),
}

/// 变更监听器
pub struct MutationMonitor {
    state: MonitorState,
    debouncer: Debouncer,
    stats: MonitorStats,
}

impl MutationMonitor {
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: MonitorState::Idle,
            debouncer: Debouncer::new(debounce),
            stats: MonitorStats::default(),
        }
    }

    /// 开始监听文档根
    pub fn start(&mut self) {
        if self.state == MonitorState::Idle {
            tracing::debug!("开始监听文档变更");
            self.state = MonitorState::Observing;
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// 接收一批变更通知并重启防抖计时器
    pub fn observe(&mut self, records: Vec<MutationRecord>, now: Instant) {
        if self.state != MonitorState::Observing {
            tracing::trace!("监听未启动，忽略 {} 条变更", records.len());
            return;
        }

        self.stats.batches += 1;
        let nodes = records.into_iter().flat_map(|record| record.added_nodes);
        self.debouncer.push(nodes, now);
    }

    /// 防抖到期时返回本轮候选容器（已按文档顺序排列）
    pub fn poll(&mut self, now: Instant) -> Option<Vec<Handle>> {
        let nodes = self.debouncer.poll(now)?;
        Some(discover_all(&nodes))
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    pub fn set_debounce(&mut self, window: Duration) {
        self.debouncer.set_window(window);
    }

    /// 丢弃尚未处理的变更
    pub fn cancel_pending(&mut self) {
        self.debouncer.cancel();
    }

    pub fn stats(&self) -> MonitorStats {
        self.stats
    }

    /// 对候选容器运行一次分类与注入
    ///
    /// 已带标记的节点只做一次属性检查，不会进入分类器。
    pub fn run_pass(
        &mut self,
        candidates: &[Handle],
        tracker: &mut ProcessedTracker,
        injector: &mut InjectionController,
        on_translate: &TranslateCallback,
    ) -> PassReport {
        let mut report = PassReport {
            candidates: candidates.len(),
            ..PassReport::default()
        };

        for candidate in candidates {
            match process_candidate(candidate, tracker, injector, on_translate) {
                Ok(CandidateOutcome::Marked) => report.skipped_marked += 1,
                Ok(CandidateOutcome::Miss) => report.issues.push(ScanIssue::ClassificationMiss),
                Ok(CandidateOutcome::Post(post, issues, injected)) => {
                    if injected {
                        report.injected += 1;
                    }
                    report.issues.extend(issues);
                    report.posts.push(post);
                }
                Err(error) => {
                    tracing::warn!("处理候选节点失败: {}", error);
                    report.issues.push(ScanIssue::NodeFailed { error });
                }
            }
        }

        self.stats.passes += 1;
        self.stats.candidates += report.candidates;
        self.stats.posts += report.posts.len();
        self.stats.injected += report.injected;
        self.stats.skipped_marked += report.skipped_marked;
        self.stats.failures += report.failures();

        tracing::debug!(
            "扫描完成: 候选 {}，帖子 {}，注入 {}，跳过已处理 {}",
            report.candidates,
            report.posts.len(),
            report.injected,
            report.skipped_marked
        );
        report
    }
}

fn process_candidate(
    candidate: &Handle,
    tracker: &mut ProcessedTracker,
    injector: &mut InjectionController,
    on_translate: &TranslateCallback,
) -> TranslatorResult<CandidateOutcome> {
    if tracker.is_processed(candidate) {
        return Ok(CandidateOutcome::Marked);
    }
    if !crate::dom::is_attached(candidate) {
        return Err(TranslatorError::DetachedNode);
    }

    let Some(post) = classify(candidate) else {
        tracing::trace!("节点不是帖子");
        return Ok(CandidateOutcome::Miss);
    };

    let mut issues = Vec::new();
    if !post.degraded.is_empty() {
        tracing::debug!("帖子 {} 部分字段缺失: {:?}", post.id, post.degraded);
        issues.push(ScanIssue::ExtractionDegraded {
            id: post.id.clone(),
            missing: post.degraded.clone(),
        });
    }

    let injected = match injector.inject(&post, TranslateCallback::clone(on_translate)) {
        InjectOutcome::Injected { .. } => true,
        InjectOutcome::AlreadyPresent => false,
        InjectOutcome::Skipped { reason } => {
            issues.push(ScanIssue::InjectionSkipped {
                id: post.id.clone(),
                reason,
            });
            false
        }
    };

    tracker.mark_processed(candidate, &post.id);
    Ok(CandidateOutcome::Post(post, issues, injected))
}

impl Default for MutationMonitor {
    fn default() -> Self {
        Self::new(crate::translation::config::constants::DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::dom::{find_descendant, get_node_attr, html_to_dom};
    use crate::injection::TranslateIntent;

    fn noop() -> TranslateCallback {
        Rc::new(|_: &TranslateIntent| {})
    }

    #[test]
    fn test_idle_monitor_ignores_records() {
        let start = Instant::now();
        let mut monitor = MutationMonitor::default();
        monitor.observe(vec![MutationRecord::default()], start);
        assert!(monitor.poll(start + Duration::from_secs(1)).is_none());

        monitor.start();
        assert_eq!(monitor.state(), MonitorState::Observing);
    }

    #[test]
    fn test_pass_marks_and_skips_on_rerun() {
        let dom = html_to_dom(
            br#"<main><article><a href="/a/status/1"><time datetime="2024-01-01T00:00:00Z">1h</time></a><span>first post body text</span></article><aside id="x">x</aside></main>"#,
            "utf-8",
        )
        .expect("parse");
        let article = find_descendant(&dom.document, |n| crate::dom::get_node_name(n) == Some("article"))
            .expect("article");
        let aside = find_descendant(&dom.document, |n| get_node_attr(n, "id").as_deref() == Some("x"))
            .expect("aside");

        let mut monitor = MutationMonitor::default();
        let mut tracker = ProcessedTracker::default();
        let mut injector = InjectionController::default();
        let callback = noop();

        let candidates = vec![article.clone(), aside];
        let first = monitor.run_pass(&candidates, &mut tracker, &mut injector, &callback);
        assert_eq!(first.posts.len(), 1);
        assert_eq!(first.injected, 1);
        assert_eq!(first.misses(), 1);
        assert!(tracker.is_processed(&article));

        let second = monitor.run_pass(&candidates, &mut tracker, &mut injector, &callback);
        assert_eq!(second.skipped_marked, 1);
        assert_eq!(second.injected, 0);
        assert!(second.posts.is_empty());
        assert_eq!(monitor.stats().passes, 2);
    }

    #[test]
    fn test_detached_candidate_does_not_abort_pass() {
        let dom = html_to_dom(
            br#"<article id="gone"><span>removed before the pass</span></article><article id="kept"><span>still here in the document</span></article>"#,
            "utf-8",
        )
        .expect("parse");
        let gone = find_descendant(&dom.document, |n| get_node_attr(n, "id").as_deref() == Some("gone"))
            .expect("gone");
        let kept = find_descendant(&dom.document, |n| get_node_attr(n, "id").as_deref() == Some("kept"))
            .expect("kept");
        crate::dom::detach(&gone);

        let mut monitor = MutationMonitor::default();
        let report = monitor.run_pass(
            &[gone, kept],
            &mut ProcessedTracker::default(),
            &mut InjectionController::default(),
            &noop(),
        );

        assert_eq!(report.failures(), 1);
        assert_eq!(report.posts.len(), 1);
        assert!(matches!(
            report.issues[0],
            ScanIssue::NodeFailed {
                error: TranslatorError::DetachedNode
            }
        ));
    }
}
