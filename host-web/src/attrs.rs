//! # Attrs 模块
//!
//! 从元素的 `data-*` 属性解析效果种类与参数。
//!
//! 解析只依赖一个"按名称取属性"的函数，不接触 DOM，可在原生目标上测试。
//!
//! | 属性                   | 说明                                   |
//! |------------------------|----------------------------------------|
//! | `data-fx`              | `particles` / `counter` / `reveal`     |
//! | `data-fx-threshold`    | 可见比例阈值                           |
//! | `data-fx-motion`       | `always` 表示忽略减少动态效果偏好      |
//! | `data-count-to`        | 计数终值（必填）                       |
//! | `data-count-from`      | 计数起始值                             |
//! | `data-count-duration`  | 持续时间（毫秒）                       |
//! | `data-count-decimals`  | 小数位数                               |
//! | `data-count-easing`    | 缓动名称                               |
//! | `data-reveal-step`     | 相邻两项的延迟（毫秒）                 |
//! | `data-reveal-max`      | 单项延迟上限（毫秒）                   |

use fx_runtime::EffectOptions;
use fx_runtime::effects::{CountUp, Easing, StaggerPlan};
use tracing::warn;

/// 计数默认持续时间（毫秒）
const DEFAULT_COUNT_DURATION_MS: f64 = 2000.0;

/// 内置效果种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FxKind {
    /// 粒子连线背景（持续效果，响应 resize）
    Particles,
    /// 数字滚动（一次性）
    Counter,
    /// 分组依次出现（一次性）
    Reveal,
}

impl FxKind {
    /// 解析 `data-fx` 的值
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "particles" => Some(Self::Particles),
            "counter" => Some(Self::Counter),
            "reveal" => Some(Self::Reveal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Particles => "particles",
            Self::Counter => "counter",
            Self::Reveal => "reveal",
        }
    }
}

/// 在默认选项上叠加元素属性
pub fn options_from_attrs(
    kind: FxKind,
    defaults: EffectOptions,
    attr: impl Fn(&str) -> Option<String>,
) -> EffectOptions {
    let mut options = defaults.with_resize(kind == FxKind::Particles);
    if let Some(threshold) = parse_number(&attr, "data-fx-threshold") {
        options = options.with_threshold(threshold);
    }
    if attr("data-fx-motion").as_deref() == Some("always") {
        options = options.with_reduced_motion(false);
    }
    options
}

/// 读取计数参数，缺少 `data-count-to` 时返回 `None`
pub fn count_up_from_attrs(attr: impl Fn(&str) -> Option<String>) -> Option<CountUp> {
    let Some(to) = parse_number(&attr, "data-count-to") else {
        warn!("计数元素缺少有效的 data-count-to");
        return None;
    };
    let duration = parse_number(&attr, "data-count-duration").unwrap_or(DEFAULT_COUNT_DURATION_MS);
    let mut counter = CountUp::new(to, duration);
    if let Some(from) = parse_number(&attr, "data-count-from") {
        counter = counter.with_from(from);
    }
    if let Some(decimals) = attr("data-count-decimals").and_then(|v| v.trim().parse().ok()) {
        counter = counter.with_decimals(decimals);
    }
    if let Some(name) = attr("data-count-easing") {
        match Easing::from_name(&name) {
            Some(easing) => counter = counter.with_easing(easing),
            None => warn!(easing = %name, "未知的缓动名称，使用默认值"),
        }
    }
    Some(counter)
}

/// 读取依次出现的延迟计划
pub fn stagger_from_attrs(attr: impl Fn(&str) -> Option<String>) -> StaggerPlan {
    let defaults = StaggerPlan::default();
    StaggerPlan::new(
        parse_number(&attr, "data-reveal-step").unwrap_or(defaults.step_ms),
        parse_number(&attr, "data-reveal-max").unwrap_or(defaults.max_delay_ms),
    )
}

fn parse_number(attr: &impl Fn(&str) -> Option<String>, name: &str) -> Option<f64> {
    let raw = attr(name)?;
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            warn!(attr = name, value = %raw, "属性值不是有效数字，已忽略");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fx_runtime::effects::counter::MAX_DECIMALS;
    use std::collections::HashMap;

    fn attrs(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(FxKind::parse("particles"), Some(FxKind::Particles));
        assert_eq!(FxKind::parse(" counter "), Some(FxKind::Counter));
        assert_eq!(FxKind::parse("modal"), None);
        assert_eq!(FxKind::Reveal.as_str(), "reveal");
    }

    #[test]
    fn test_options_from_attrs() {
        let options = options_from_attrs(
            FxKind::Particles,
            EffectOptions::default(),
            attrs(&[("data-fx-threshold", "0.25"), ("data-fx-motion", "always")]),
        );
        assert_eq!(options.visibility_threshold, 0.25);
        assert!(options.resize_reactive);
        assert!(!options.respect_reduced_motion);

        let options = options_from_attrs(
            FxKind::Counter,
            EffectOptions::default(),
            attrs(&[("data-fx-threshold", "abc")]),
        );
        assert_eq!(options, EffectOptions::default());
    }

    #[test]
    fn test_count_up_from_attrs() {
        let counter = count_up_from_attrs(attrs(&[
            ("data-count-to", "1250"),
            ("data-count-duration", "800"),
            ("data-count-decimals", "1"),
            ("data-count-easing", "linear"),
        ]))
        .unwrap();
        assert_eq!(counter.to, 1250.0);
        assert_eq!(counter.duration_ms, 800.0);
        assert_eq!(counter.decimals, 1);
        assert_eq!(counter.easing, Easing::Linear);
        assert_eq!(counter.from, 0.0);

        assert!(count_up_from_attrs(attrs(&[])).is_none());
        assert!(count_up_from_attrs(attrs(&[("data-count-to", "NaN")])).is_none());
    }

    #[test]
    fn test_count_decimals_bounded() {
        let counter = count_up_from_attrs(attrs(&[
            ("data-count-to", "3"),
            ("data-count-decimals", "1000000000"),
        ]))
        .unwrap();
        assert_eq!(counter.decimals, MAX_DECIMALS);
    }

    #[test]
    fn test_stagger_from_attrs() {
        let plan = stagger_from_attrs(attrs(&[("data-reveal-step", "120")]));
        assert_eq!(plan.step_ms, 120.0);
        assert_eq!(plan.max_delay_ms, StaggerPlan::default().max_delay_ms);
    }
}
