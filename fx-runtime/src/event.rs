//! # Event 模块
//!
//! 控制器产生的生命周期事件，宿主或测试通过 `drain_events()` 取走。

use crate::controller::{DisableReason, HandleId};
use crate::error::FxError;

/// 控制器事件
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// 句柄创建后进入 Paused
    Created(HandleId),
    /// 句柄创建即被禁用
    Disabled(HandleId, DisableReason),
    /// 首次激活，`on_start` 成功
    Started(HandleId),
    /// 进入 Running
    Resumed(HandleId),
    /// 离开 Running
    Paused(HandleId),
    /// 一次性效果已触发
    Fired(HandleId),
    /// 被兜住的失败
    Faulted(FxError),
    /// 句柄已销毁
    Destroyed(HandleId),
}

impl ControllerEvent {
    /// 事件关联的句柄
    pub fn handle(&self) -> Option<HandleId> {
        match self {
            Self::Created(id)
            | Self::Disabled(id, _)
            | Self::Started(id)
            | Self::Resumed(id)
            | Self::Paused(id)
            | Self::Fired(id)
            | Self::Destroyed(id) => Some(*id),
            Self::Faulted(err) => err.handle(),
        }
    }

    /// 简短名称（用于轨迹输出）
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Disabled(..) => "disabled",
            Self::Started(_) => "started",
            Self::Resumed(_) => "resumed",
            Self::Paused(_) => "paused",
            Self::Fired(_) => "fired",
            Self::Faulted(_) => "faulted",
            Self::Destroyed(_) => "destroyed",
        }
    }

    /// 是否为失败事件
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Faulted(_))
    }
}

impl std::fmt::Display for ControllerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled(id, reason) => write!(f, "{id} disabled ({reason:?})"),
            Self::Faulted(err) => write!(f, "faulted: {err}"),
            other => match other.handle() {
                Some(id) => write!(f, "{id} {}", other.name()),
                None => f.write_str(other.name()),
            },
        }
    }
}
