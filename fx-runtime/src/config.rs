//! # Config 模块
//!
//! 运行时配置管理，集中管理所有配置项。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数 / 页面内联配置（最高）
//! 2. 配置文件 (fx-config.json)
//! 3. 默认值（最低）

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::capability::CapabilityThresholds;
use crate::effects::particles::{MAX_BASE_COUNT, MAX_SPEED, ParticleConfig};
use crate::error::ConfigError;
use crate::options::EffectOptions;

/// 运行时配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxConfig {
    /// 单帧最大时间差（毫秒）
    ///
    /// 超过此值（例如标签页从后台恢复）时按一个标准帧处理，不做追帧。
    #[serde(default = "default_max_frame_delta_ms")]
    pub max_frame_delta_ms: f64,

    /// 标准帧时长（毫秒）
    #[serde(default = "default_nominal_frame_ms")]
    pub nominal_frame_ms: f64,

    /// resize 事件节流间隔（毫秒）
    #[serde(default = "default_resize_throttle_ms")]
    pub resize_throttle_ms: f64,

    /// 设备档位阈值
    #[serde(default)]
    pub capability: CapabilityThresholds,

    /// 效果默认选项
    #[serde(default)]
    pub defaults: EffectOptions,

    /// 粒子效果配置
    #[serde(default)]
    pub particles: ParticleConfig,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            max_frame_delta_ms: default_max_frame_delta_ms(),
            nominal_frame_ms: default_nominal_frame_ms(),
            resize_throttle_ms: default_resize_throttle_ms(),
            capability: CapabilityThresholds::default(),
            defaults: EffectOptions::default(),
            particles: ParticleConfig::default(),
        }
    }
}

impl FxConfig {
    /// 从 JSON 字符串解析配置并校验
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载配置
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// 从文件加载配置，文件不存在时使用默认值
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// 校验配置值
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.nominal_frame_ms > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "nominal_frame_ms".to_string(),
                message: "必须大于 0".to_string(),
            });
        }
        if !(self.max_frame_delta_ms >= self.nominal_frame_ms) {
            return Err(ConfigError::InvalidValue {
                field: "max_frame_delta_ms".to_string(),
                message: "不能小于 nominal_frame_ms".to_string(),
            });
        }
        if !(self.resize_throttle_ms >= 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "resize_throttle_ms".to_string(),
                message: "不能为负数".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.defaults.visibility_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "defaults.visibility_threshold".to_string(),
                message: "必须在 [0, 1] 之间".to_string(),
            });
        }
        self.validate_particles()
    }

    fn validate_particles(&self) -> Result<(), ConfigError> {
        let particles = &self.particles;
        if !(0.0..=MAX_SPEED).contains(&particles.speed) {
            return Err(ConfigError::InvalidValue {
                field: "particles.speed".to_string(),
                message: format!("必须在 [0, {MAX_SPEED}] 之间"),
            });
        }
        if !(particles.link_distance >= 0.0 && particles.link_distance.is_finite()) {
            return Err(ConfigError::InvalidValue {
                field: "particles.link_distance".to_string(),
                message: "必须是非负有限值".to_string(),
            });
        }
        if particles.base_count > MAX_BASE_COUNT {
            return Err(ConfigError::InvalidValue {
                field: "particles.base_count".to_string(),
                message: format!("不能超过 {MAX_BASE_COUNT}"),
            });
        }
        Ok(())
    }
}

// 默认值函数
fn default_max_frame_delta_ms() -> f64 {
    1000.0
}

fn default_nominal_frame_ms() -> f64 {
    1000.0 / 60.0
}

fn default_resize_throttle_ms() -> f64 {
    150.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_json_is_default() {
        let config = FxConfig::from_json_str("{}").unwrap();
        assert_eq!(config, FxConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = FxConfig::from_json_str(
            r#"{ "resize_throttle_ms": 50, "capability": { "low_core_max": 4 } }"#,
        )
        .unwrap();
        assert_eq!(config.resize_throttle_ms, 50.0);
        assert_eq!(config.capability.low_core_max, 4);
        assert_eq!(config.capability.low_memory_gb_max, 2.0);
        assert_eq!(config.max_frame_delta_ms, 1000.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let err = FxConfig::from_json_str(r#"{ "nominal_frame_ms": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "nominal_frame_ms"));

        let err = FxConfig::from_json_str(r#"{ "max_frame_delta_ms": 5 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = FxConfig::from_json_str("not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validate_rejects_bad_particles() {
        for text in [
            r#"{ "particles": { "speed": 1e308 } }"#,
            r#"{ "particles": { "speed": -1 } }"#,
            r#"{ "particles": { "link_distance": -5 } }"#,
            r#"{ "particles": { "base_count": 1000000 } }"#,
        ] {
            let err = FxConfig::from_json_str(text).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue { ref field, .. } if field.starts_with("particles.")),
                "{text}: {err}"
            );
        }

        let config = FxConfig::from_json_str(r#"{ "particles": { "speed": 0 } }"#).unwrap();
        assert_eq!(config.particles.speed, 0.0);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "particles": {{ "base_count": 40 }} }}"#).unwrap();

        let config = FxConfig::load(file.path()).unwrap();
        assert_eq!(config.particles.base_count, 40);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = FxConfig::load_or_default(dir.path().join("missing.json")).unwrap();
        assert_eq!(config, FxConfig::default());
    }
}
