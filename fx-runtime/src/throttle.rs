//! # Throttle 模块
//!
//! resize 事件节流：首个事件立即发出，间隔内的后续事件合并为一次尾随发出。
//!
//! 节流器不持有定时器，`Defer` 由宿主负责在指定时长后调用 [`ResizeThrottle::on_timer`]。

/// 节流决策
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThrottleDecision {
    /// 立即发出
    Emit,
    /// 稍后发出，宿主需在给定毫秒数后调用 `on_timer`
    Defer(f64),
    /// 已有尾随发出在等待，本次事件被合并
    Coalesced,
}

/// resize 节流器
#[derive(Debug, Clone)]
pub struct ResizeThrottle {
    interval_ms: f64,
    last_emit_ms: Option<f64>,
    trailing_pending: bool,
}

impl ResizeThrottle {
    /// 创建节流器
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms: interval_ms.max(0.0),
            last_emit_ms: None,
            trailing_pending: false,
        }
    }

    /// 收到一次原始事件
    pub fn on_event(&mut self, now_ms: f64) -> ThrottleDecision {
        if self.trailing_pending {
            return ThrottleDecision::Coalesced;
        }
        match self.last_emit_ms {
            Some(last) if now_ms - last < self.interval_ms => {
                self.trailing_pending = true;
                ThrottleDecision::Defer(self.interval_ms - (now_ms - last))
            }
            _ => {
                self.last_emit_ms = Some(now_ms);
                ThrottleDecision::Emit
            }
        }
    }

    /// 尾随定时器到期
    ///
    /// 返回是否应当发出事件。
    pub fn on_timer(&mut self, now_ms: f64) -> bool {
        if !self.trailing_pending {
            return false;
        }
        self.trailing_pending = false;
        self.last_emit_ms = Some(now_ms);
        true
    }

    /// 是否有尾随发出在等待
    pub fn is_pending(&self) -> bool {
        self.trailing_pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_edge_emits() {
        let mut throttle = ResizeThrottle::new(150.0);
        assert_eq!(throttle.on_event(0.0), ThrottleDecision::Emit);
    }

    #[test]
    fn test_burst_collapses_to_one_trailing() {
        let mut throttle = ResizeThrottle::new(150.0);
        assert_eq!(throttle.on_event(0.0), ThrottleDecision::Emit);
        assert_eq!(throttle.on_event(50.0), ThrottleDecision::Defer(100.0));
        assert_eq!(throttle.on_event(60.0), ThrottleDecision::Coalesced);
        assert_eq!(throttle.on_event(90.0), ThrottleDecision::Coalesced);
        assert!(throttle.is_pending());

        assert!(throttle.on_timer(150.0));
        assert!(!throttle.on_timer(151.0));
        assert!(!throttle.is_pending());
    }

    #[test]
    fn test_after_interval_emits_again() {
        let mut throttle = ResizeThrottle::new(150.0);
        throttle.on_event(0.0);
        assert_eq!(throttle.on_event(200.0), ThrottleDecision::Emit);
    }

    #[test]
    fn test_zero_interval_never_defers() {
        let mut throttle = ResizeThrottle::new(0.0);
        assert_eq!(throttle.on_event(0.0), ThrottleDecision::Emit);
        assert_eq!(throttle.on_event(0.0), ThrottleDecision::Emit);
    }
}
