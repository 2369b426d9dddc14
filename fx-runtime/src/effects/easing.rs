//! # Easing 模块
//!
//! 计数器等一次性动画使用的缓动曲线。

use serde::{Deserialize, Serialize};

/// 缓动曲线
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    /// 线性（匀速）
    Linear,
    /// 二次缓出
    EaseOutQuad,
    /// 三次缓出
    #[default]
    EaseOutCubic,
    /// 三次缓入缓出
    EaseInOutCubic,
    /// 指数缓出（数字滚动常用，末段很慢）
    EaseOutExpo,
}

impl Easing {
    /// 计算缓动值
    ///
    /// `t` 会被限制在 `[0, 1]`，返回值在两端精确为 0 和 1。
    pub fn apply(&self, t: f64) -> f64 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

        match self {
            Easing::Linear => t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::EaseOutExpo => {
                if t >= 1.0 {
                    1.0
                } else {
                    1.0 - 2.0_f64.powf(-10.0 * t)
                }
            }
        }
    }

    /// 从 `data-easing` 之类的属性值解析，未知名称返回 `None`
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "linear" => Some(Self::Linear),
            "ease-out-quad" => Some(Self::EaseOutQuad),
            "ease-out-cubic" => Some(Self::EaseOutCubic),
            "ease-in-out-cubic" => Some(Self::EaseInOutCubic),
            "ease-out-expo" => Some(Self::EaseOutExpo),
            _ => None,
        }
    }
}
