//! # Controller 模块
//!
//! 可见性门控的效果控制器。
//!
//! ## 模块结构
//!
//! - [`engine`]：`EffectController`，句柄表与状态机
//! - [`slot`]：效果的类型擦除容器

pub mod engine;
mod slot;

pub use engine::EffectController;

use serde::{Deserialize, Serialize};

/// 句柄标识符
///
/// 由控制器在创建时分配，单调递增，不会复用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HandleId(pub(crate) u64);

impl HandleId {
    /// 创建句柄 ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// 获取内部 ID 值
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 句柄生命周期状态
///
/// ```text
///            create
///              │
///     ┌────────┴─────────┐
///     ▼                  ▼
///  Disabled            Paused ◄──────┐
///     │                  │ 进入视口   │ 离开视口 / on_frame 失败
///     │                  ▼            │
///     │               Running ───────┘
///     │                  │
///     │           (一次性) Fired
///     ▼                  ▼
///  Destroyed ◄──── destroy / unload
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectState {
    /// 永久禁用（目标缺失或用户偏好减少动态效果）
    Disabled,
    /// 已暂停，等待进入视口
    Paused,
    /// 正在逐帧运行
    Running,
    /// 一次性效果已触发
    Fired,
    /// 已销毁
    Destroyed,
}

impl EffectState {
    /// 是否为终止状态（除销毁外不再迁移）
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disabled | Self::Fired | Self::Destroyed)
    }
}

impl std::fmt::Display for EffectState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disabled => "disabled",
            Self::Paused => "paused",
            Self::Running => "running",
            Self::Fired => "fired",
            Self::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// 禁用原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisableReason {
    /// 目标元素不存在或未挂载
    MissingTarget,
    /// 用户偏好减少动态效果
    ReducedMotion,
    /// 宿主无法注册可见性观察器
    ObserverUnavailable,
}

/// 句柄种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleKind {
    /// 持续效果
    Continuous,
    /// 一次性效果
    OneShot,
}

/// 句柄快照（只读）
#[derive(Debug, Clone, PartialEq)]
pub struct HandleInfo {
    pub id: HandleId,
    pub kind: HandleKind,
    pub state: EffectState,
    /// 是否调用过 `on_start`（且成功）
    pub started: bool,
    /// 是否因回调失败而失效
    pub faulted: bool,
    /// 尚未执行的清理动作数量
    pub pending_cleanups: usize,
    /// 是否有挂起的帧请求
    pub frame_pending: bool,
    /// 已推进的帧数
    pub frames: u64,
}

impl HandleInfo {
    /// 是否正在运行
    pub fn is_running(&self) -> bool {
        self.state == EffectState::Running
    }
}
