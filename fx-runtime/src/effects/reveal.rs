//! # Reveal 模块
//!
//! 分组元素依次出现时的延迟计划。

use serde::{Deserialize, Serialize};

/// 依次出现的延迟计划
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaggerPlan {
    /// 相邻两项之间的延迟（毫秒）
    pub step_ms: f64,
    /// 单项延迟上限（毫秒），避免长列表末尾等太久
    pub max_delay_ms: f64,
}

impl Default for StaggerPlan {
    fn default() -> Self {
        Self {
            step_ms: 80.0,
            max_delay_ms: 600.0,
        }
    }
}

impl StaggerPlan {
    pub fn new(step_ms: f64, max_delay_ms: f64) -> Self {
        Self {
            step_ms,
            max_delay_ms,
        }
    }

    /// 第 `index` 项的延迟
    pub fn delay_for(&self, index: usize) -> f64 {
        let step = self.step_ms.max(0.0);
        let cap = self.max_delay_ms.max(0.0);
        (index as f64 * step).min(cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_capped() {
        let plan = StaggerPlan::new(100.0, 250.0);
        let delays: Vec<f64> = (0..5).map(|i| plan.delay_for(i)).collect();
        assert_eq!(delays, vec![0.0, 100.0, 200.0, 250.0, 250.0]);
    }

    #[test]
    fn test_negative_step_is_zero() {
        let plan = StaggerPlan::new(-10.0, 100.0);
        assert_eq!(plan.delay_for(3), 0.0);
    }

    #[test]
    fn test_default_plan() {
        let plan = StaggerPlan::default();
        assert_eq!(plan.delay_for(1), 80.0);
        assert_eq!(plan.delay_for(100), 600.0);
    }
}
