//! # Capability 模块
//!
//! 根据宿主提供的设备提示（逻辑核心数、内存）粗略划分设备档位，
//! 效果据此缩放内部工作量（例如粒子数量）。

use serde::{Deserialize, Serialize};

/// 设备能力提示
///
/// 浏览器里分别对应 `navigator.hardwareConcurrency` 和 `navigator.deviceMemory`，
/// 取不到时为 `None`。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceHints {
    /// 逻辑核心数
    #[serde(default)]
    pub logical_cores: Option<u32>,
    /// 近似内存（GB）
    #[serde(default)]
    pub memory_gb: Option<f64>,
}

impl DeviceHints {
    /// 创建设备提示
    pub fn new(logical_cores: Option<u32>, memory_gb: Option<f64>) -> Self {
        Self {
            logical_cores,
            memory_gb,
        }
    }
}

/// 低档判定阈值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapabilityThresholds {
    /// 逻辑核心数 `<=` 此值视为低档
    #[serde(default = "default_low_core_max")]
    pub low_core_max: u32,
    /// 内存（GB）`<=` 此值视为低档
    #[serde(default = "default_low_memory_gb_max")]
    pub low_memory_gb_max: f64,
}

impl Default for CapabilityThresholds {
    fn default() -> Self {
        Self {
            low_core_max: default_low_core_max(),
            low_memory_gb_max: default_low_memory_gb_max(),
        }
    }
}

fn default_low_core_max() -> u32 {
    2
}

fn default_low_memory_gb_max() -> f64 {
    2.0
}

/// 设备能力档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityTier {
    /// 低档设备
    Low,
    /// 普通设备
    #[default]
    Normal,
}

impl CapabilityTier {
    /// 根据设备提示划分档位
    ///
    /// 任一提示落在低档阈值内即为低档；提示缺失时不参与判定。
    pub fn classify(hints: DeviceHints, thresholds: CapabilityThresholds) -> Self {
        let low_cores = hints
            .logical_cores
            .is_some_and(|cores| cores <= thresholds.low_core_max);
        let low_memory = hints
            .memory_gb
            .is_some_and(|gb| gb <= thresholds.low_memory_gb_max);

        if low_cores || low_memory {
            Self::Low
        } else {
            Self::Normal
        }
    }

    /// 按档位缩放工作单元数
    ///
    /// 低档约为普通档的四分之一，且至少为 1（`normal_units` 为 0 时保持 0）。
    pub fn scale(self, normal_units: usize) -> usize {
        match self {
            Self::Normal => normal_units,
            Self::Low if normal_units == 0 => 0,
            Self::Low => (normal_units / 4).max(1),
        }
    }
}

impl std::fmt::Display for CapabilityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => f.write_str("low"),
            Self::Normal => f.write_str("normal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(cores: Option<u32>, memory: Option<f64>) -> CapabilityTier {
        CapabilityTier::classify(
            DeviceHints::new(cores, memory),
            CapabilityThresholds::default(),
        )
    }

    #[test]
    fn test_two_cores_is_low() {
        assert_eq!(classify(Some(2), None), CapabilityTier::Low);
        assert_eq!(classify(Some(2), Some(16.0)), CapabilityTier::Low);
    }

    #[test]
    fn test_low_memory_is_low() {
        assert_eq!(classify(Some(8), Some(1.0)), CapabilityTier::Low);
    }

    #[test]
    fn test_missing_hints_is_normal() {
        assert_eq!(classify(None, None), CapabilityTier::Normal);
        assert_eq!(classify(Some(8), Some(8.0)), CapabilityTier::Normal);
    }

    #[test]
    fn test_scale() {
        assert_eq!(CapabilityTier::Normal.scale(80), 80);
        assert_eq!(CapabilityTier::Low.scale(80), 20);
        assert_eq!(CapabilityTier::Low.scale(3), 1);
        assert_eq!(CapabilityTier::Low.scale(0), 0);
    }
}
