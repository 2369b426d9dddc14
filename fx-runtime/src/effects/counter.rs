//! # Counter 模块
//!
//! 数字滚动（count-up）动画的取值计算。

use serde::{Deserialize, Serialize};

use super::easing::Easing;

/// 小数位数上限
pub const MAX_DECIMALS: usize = 10;

/// 数字滚动
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountUp {
    pub from: f64,
    pub to: f64,
    /// 持续时间（毫秒）
    pub duration_ms: f64,
    #[serde(default)]
    pub easing: Easing,
    /// 显示的小数位数
    #[serde(default)]
    pub decimals: usize,
}

impl CountUp {
    /// 从 0 滚动到 `to`
    pub fn new(to: f64, duration_ms: f64) -> Self {
        Self {
            from: 0.0,
            to,
            duration_ms,
            easing: Easing::default(),
            decimals: 0,
        }
    }

    pub fn with_from(mut self, from: f64) -> Self {
        self.from = from;
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// 设置小数位数（不超过 [`MAX_DECIMALS`]）
    pub fn with_decimals(mut self, decimals: usize) -> Self {
        self.decimals = decimals.min(MAX_DECIMALS);
        self
    }

    /// 经过 `elapsed_ms` 后的值；结束后精确等于 `to`
    pub fn value_at(&self, elapsed_ms: f64) -> f64 {
        if self.is_done(elapsed_ms) {
            return self.to;
        }
        let t = elapsed_ms / self.duration_ms;
        self.from + (self.to - self.from) * self.easing.apply(t)
    }

    /// 动画是否已结束（持续时间非正时立即结束）
    pub fn is_done(&self, elapsed_ms: f64) -> bool {
        !(self.duration_ms > 0.0) || elapsed_ms >= self.duration_ms
    }

    /// 按小数位数格式化
    pub fn format(&self, value: f64) -> String {
        format!("{:.*}", self.decimals.min(MAX_DECIMALS), value)
    }

    /// 最终显示的文本（减少动态效果时直接使用）
    pub fn final_text(&self) -> String {
        self.format(self.to)
    }
}
