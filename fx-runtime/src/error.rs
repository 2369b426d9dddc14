//! # Error 模块
//!
//! 定义 fx-runtime 中使用的错误类型。
//!
//! 控制器对外从不返回这些错误：它们只被记录日志并以
//! [`ControllerEvent::Faulted`](crate::event::ControllerEvent::Faulted) 的形式上报。

use thiserror::Error;

use crate::controller::HandleId;

/// 效果回调所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectPhase {
    /// `on_start`
    Start,
    /// `on_frame`
    Frame,
    /// `on_stop`
    Stop,
    /// `on_resize`
    Resize,
    /// 一次性触发回调
    Fire,
}

impl std::fmt::Display for EffectPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Start => "on_start",
            Self::Frame => "on_frame",
            Self::Stop => "on_stop",
            Self::Resize => "on_resize",
            Self::Fire => "fire",
        };
        f.write_str(name)
    }
}

/// 效果自身返回的错误
///
/// 由 `Effect` 的各个回调返回，控制器负责兜底。
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct EffectError {
    /// 错误消息
    pub message: String,
}

impl EffectError {
    /// 创建效果错误
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 宿主环境错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    /// 宿主不支持某项能力（如缺少 IntersectionObserver）
    #[error("宿主不支持 {capability}")]
    Unsupported { capability: String },

    /// 注册或移除监听器失败
    #[error("监听器操作失败: {message}")]
    Listener { message: String },

    /// 帧调度失败
    #[error("帧调度失败: {message}")]
    Frame { message: String },
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("读取配置文件 {path} 失败: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 配置格式无效
    #[error("配置格式无效: {0}")]
    Parse(#[from] serde_json::Error),

    /// 配置值超出范围
    #[error("配置项 '{field}' 的值无效: {message}")]
    InvalidValue { field: String, message: String },
}

/// 场景脚本错误
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// 读取场景文件失败
    #[error("读取场景文件 {path} 失败: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 场景格式无效
    #[error("场景格式无效: {0}")]
    Parse(#[from] serde_json::Error),

    /// 效果名称重复
    #[error("效果名称重复: {0}")]
    DuplicateEffect(String),

    /// 引用了未声明的效果
    #[error("未声明的效果: {0}")]
    UnknownEffect(String),
}

/// fx-runtime 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FxError {
    /// 目标元素不存在或未挂载到文档
    #[error("句柄 {handle} 的目标元素不存在")]
    MissingTarget { handle: HandleId },

    /// 效果回调失败
    #[error("句柄 {handle} 的 {phase} 回调失败: {message}")]
    EffectFault {
        handle: HandleId,
        phase: EffectPhase,
        message: String,
    },

    /// 某个清理动作失败
    #[error("句柄 {handle} 的清理动作 '{label}' 失败: {message}")]
    CleanupFault {
        handle: HandleId,
        label: String,
        message: String,
    },

    /// 可见性观察器无法注册
    #[error("句柄 {handle} 无法注册可见性观察器: {source}")]
    ObserverUnavailable { handle: HandleId, source: HostError },

    /// resize 监听器无法注册（句柄继续运行，只是不再响应尺寸变化）
    #[error("句柄 {handle} 无法注册 resize 监听器: {source}")]
    ResizeUnavailable { handle: HandleId, source: HostError },

    /// 帧调度失败
    #[error("句柄 {handle} 无法调度下一帧: {source}")]
    FrameUnavailable { handle: HandleId, source: HostError },

    /// 选项值无效（已被修正）
    #[error("选项 '{option}' 的值无效: {message}")]
    InvalidOption { option: String, message: String },
}

impl FxError {
    /// 错误关联的句柄
    pub fn handle(&self) -> Option<HandleId> {
        match self {
            Self::MissingTarget { handle }
            | Self::EffectFault { handle, .. }
            | Self::CleanupFault { handle, .. }
            | Self::ObserverUnavailable { handle, .. }
            | Self::ResizeUnavailable { handle, .. }
            | Self::FrameUnavailable { handle, .. } => Some(*handle),
            Self::InvalidOption { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_fault_message() {
        let err = FxError::EffectFault {
            handle: HandleId::new(3),
            phase: EffectPhase::Frame,
            message: "boom".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("on_frame"));
        assert!(text.contains("boom"));
        assert_eq!(err.handle(), Some(HandleId::new(3)));
    }

    #[test]
    fn test_invalid_option_has_no_handle() {
        let err = FxError::InvalidOption {
            option: "visibility_threshold".to_string(),
            message: "NaN".to_string(),
        };
        assert_eq!(err.handle(), None);
    }
}
