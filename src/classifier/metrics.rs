use markup5ever_rcdom::Handle;

use super::post::Metrics;
use crate::dom::selectors::{self, matches_any, Selector};
use crate::dom::{find_descendant, get_node_attr, text_content};

/// 解析缩写计数：`1.2K` → 1200，`2.5M` → 2500000，`1,234` → 1234
///
/// 空串或无法解析时返回 `None`，而不是 0。
pub fn parse_metric(text: &str) -> Option<u64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }

    let (number, multiplier) = match cleaned.chars().last()? {
        'K' | 'k' => (&cleaned[..cleaned.len() - 1], 1_000f64),
        'M' | 'm' => (&cleaned[..cleaned.len() - 1], 1_000_000f64),
        'B' | 'b' => (&cleaned[..cleaned.len() - 1], 1_000_000_000f64),
        _ => return cleaned.parse::<u64>().ok(),
    };

    let value: f64 = number.trim().parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * multiplier).round() as u64)
}

fn metric_value(container: &Handle, selectors: &[Selector]) -> Option<u64> {
    let node = find_descendant(container, |n| matches_any(n, selectors))?;

    if let Some(value) = parse_metric(&text_content(&node)) {
        return Some(value);
    }

    // 计数为 0 时站点不渲染数字，只能从 aria-label 的首个词读取
    get_node_attr(&node, "aria-label")
        .and_then(|label| label.split_whitespace().next().map(str::to_string))
        .and_then(|token| parse_metric(&token))
}

/// 提取互动计数，全部缺失时返回 `None`
pub fn extract_metrics(container: &Handle) -> Option<Metrics> {
    let metrics = Metrics {
        replies: metric_value(container, selectors::REPLY_METRIC),
        retweets: metric_value(container, selectors::RETWEET_METRIC),
        likes: metric_value(container, selectors::LIKE_METRIC),
    };

    (!metrics.is_empty()).then_some(metrics)
}
