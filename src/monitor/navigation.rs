use std::time::Duration;

use tokio::time::Instant;

/// 站内导航检测
///
/// 单页应用切换路由时不会重新加载页面，只能低频轮询地址是否变化。
#[derive(Debug)]
pub struct NavigationWatcher {
    last_url: Option<String>,
    interval: Duration,
    next_poll: Option<Instant>,
}

impl NavigationWatcher {
    pub fn new(interval: Duration) -> Self {
        Self {
            last_url: None,
            interval,
            next_poll: None,
        }
    }

    /// 记录初始地址并开始轮询
    pub fn start(&mut self, url: &str, now: Instant) {
        self.last_url = Some(url.to_string());
        self.next_poll = Some(now + self.interval);
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_poll.is_some_and(|due| due <= now)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_poll
    }

    /// 比较地址，变化时返回 true；每次调用都会安排下一次轮询
    pub fn check(&mut self, url: &str, now: Instant) -> bool {
        if self.next_poll.is_some() {
            self.next_poll = Some(now + self.interval);
        }

        match &self.last_url {
            Some(last) if last == url => false,
            Some(last) => {
                tracing::info!("检测到站内导航: {} -> {}", last, url);
                self.last_url = Some(url.to_string());
                true
            }
            None => {
                self.last_url = Some(url.to_string());
                false
            }
        }
    }

    pub fn current_url(&self) -> Option<&str> {
        self.last_url.as_deref()
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_each_change_once() {
        let start = Instant::now();
        let mut watcher = NavigationWatcher::new(Duration::from_secs(1));
        watcher.start("https://x.com/home", start);

        assert!(!watcher.is_due(start));
        let tick = start + Duration::from_secs(1);
        assert!(watcher.is_due(tick));
        assert!(!watcher.check("https://x.com/home", tick));

        let tick = tick + Duration::from_secs(1);
        assert!(watcher.check("https://x.com/alice", tick));
        assert!(!watcher.check("https://x.com/alice", tick));
        assert_eq!(watcher.current_url(), Some("https://x.com/alice"));
        assert_eq!(watcher.next_deadline(), Some(tick + Duration::from_secs(1)));
    }
}
