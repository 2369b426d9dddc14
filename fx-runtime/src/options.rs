//! # Options 模块
//!
//! 单个效果的创建选项。

use serde::{Deserialize, Serialize};

use crate::error::FxError;

/// 效果创建选项
///
/// 所有字段都有默认值，JSON 中可以只写需要覆盖的字段。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectOptions {
    /// 是否尊重用户的"减少动态效果"偏好
    #[serde(default = "default_respect_reduced_motion")]
    pub respect_reduced_motion: bool,

    /// 可见比例阈值 (0.0 - 1.0)
    ///
    /// 目标相交且相交比例 `>=` 此值时视为可见。
    #[serde(default)]
    pub visibility_threshold: f64,

    /// 是否响应视口尺寸变化
    #[serde(default)]
    pub resize_reactive: bool,
}

impl Default for EffectOptions {
    fn default() -> Self {
        Self {
            respect_reduced_motion: default_respect_reduced_motion(),
            visibility_threshold: 0.0,
            resize_reactive: false,
        }
    }
}

impl EffectOptions {
    /// 设置可见比例阈值
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.visibility_threshold = threshold;
        self
    }

    /// 设置是否响应视口尺寸变化
    pub fn with_resize(mut self, resize_reactive: bool) -> Self {
        self.resize_reactive = resize_reactive;
        self
    }

    /// 设置是否尊重减少动态效果偏好
    pub fn with_reduced_motion(mut self, respect: bool) -> Self {
        self.respect_reduced_motion = respect;
        self
    }

    /// 修正越界的选项值
    ///
    /// 阈值被限制在 `[0, 1]`，NaN 视为 0。返回修正后的选项以及
    /// 被修正项对应的错误（仅用于日志）。
    pub fn normalized(self) -> (Self, Option<FxError>) {
        let threshold = self.visibility_threshold;
        if threshold.is_nan() {
            let fixed = Self {
                visibility_threshold: 0.0,
                ..self
            };
            let err = FxError::InvalidOption {
                option: "visibility_threshold".to_string(),
                message: "NaN，按 0 处理".to_string(),
            };
            return (fixed, Some(err));
        }
        if !(0.0..=1.0).contains(&threshold) {
            let fixed = Self {
                visibility_threshold: threshold.clamp(0.0, 1.0),
                ..self
            };
            let err = FxError::InvalidOption {
                option: "visibility_threshold".to_string(),
                message: format!("{threshold} 超出 [0, 1]，已截断"),
            };
            return (fixed, Some(err));
        }
        (self, None)
    }
}

fn default_respect_reduced_motion() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = EffectOptions::default();
        assert!(options.respect_reduced_motion);
        assert_eq!(options.visibility_threshold, 0.0);
        assert!(!options.resize_reactive);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options: EffectOptions =
            serde_json::from_str(r#"{ "visibility_threshold": 0.3 }"#).unwrap();
        assert!(options.respect_reduced_motion);
        assert_eq!(options.visibility_threshold, 0.3);
        assert!(!options.resize_reactive);
    }

    #[test]
    fn test_normalized_clamps_threshold() {
        let (options, err) = EffectOptions::default().with_threshold(1.7).normalized();
        assert_eq!(options.visibility_threshold, 1.0);
        assert!(err.is_some());

        let (options, err) = EffectOptions::default().with_threshold(f64::NAN).normalized();
        assert_eq!(options.visibility_threshold, 0.0);
        assert!(err.is_some());

        let (options, err) = EffectOptions::default().with_threshold(0.5).normalized();
        assert_eq!(options.visibility_threshold, 0.5);
        assert!(err.is_none());
    }
}
