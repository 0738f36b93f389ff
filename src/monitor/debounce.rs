use std::rc::Rc;
use std::time::Duration;

use markup5ever_rcdom::Handle;
use tokio::time::Instant;

/// 变更批次的防抖合并
///
/// 窗口内到达的新批次会重启计时器；各批次的新增节点取并集，
/// 计时器到期时一次性交出。
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
    pending: Vec<Handle>,
    batches: usize,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
            pending: Vec::new(),
            batches: 0,
        }
    }

    /// 加入一个批次并重启计时器
    pub fn push<I>(&mut self, nodes: I, now: Instant)
    where
        I: IntoIterator<Item = Handle>,
    {
        for node in nodes {
            if !self.pending.iter().any(|p| Rc::ptr_eq(p, &node)) {
                self.pending.push(node);
            }
        }
        self.batches += 1;
        self.deadline = Some(now + self.window);
    }

    /// 计时器到期时交出合并后的节点，否则返回 `None`
    pub fn poll(&mut self, now: Instant) -> Option<Vec<Handle>> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                let batches = std::mem::take(&mut self.batches);
                let nodes = std::mem::take(&mut self.pending);
                tracing::trace!("防抖窗口结束，合并 {} 个批次共 {} 个节点", batches, nodes.len());
                Some(nodes)
            }
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 修改窗口长度，对下一个批次生效
    pub fn set_window(&mut self, window: Duration) {
        self.window = window;
    }

    /// 丢弃未处理的批次
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.pending.clear();
        self.batches = 0;
    }
}
