//! # Effect 模块
//!
//! 效果的能力集定义。
//!
//! ## 核心概念
//!
//! - `Effect`: 持续效果，`on_start` / `on_frame` / `on_stop` 三段生命周期
//! - `OneShot`: 一次性效果，首次可见时触发一次
//!
//! 效果只关心"画什么"，什么时候跑由控制器决定。监听器的注册与移除
//! 归控制器所有，`on_stop` 只负责释放效果自己分配的资源。

use serde::{Deserialize, Serialize};

use crate::capability::CapabilityTier;
use crate::clock::FrameContext;
use crate::controller::HandleId;
use crate::error::EffectError;

/// 视口尺寸（CSS 像素）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// 创建视口尺寸
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// 传给 `on_start` 的上下文
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartContext {
    /// 所属句柄
    pub handle: HandleId,
    /// 设备能力档位
    pub tier: CapabilityTier,
}

/// 持续效果
///
/// ## 实现示例
///
/// ```rust,ignore
/// struct Spinner;
///
/// impl Effect for Spinner {
///     type State = f64;
///
///     fn on_start(&mut self, _ctx: &StartContext) -> Result<f64, EffectError> {
///         Ok(0.0)
///     }
///
///     fn on_frame(&mut self, angle: &mut f64, frame: &FrameContext) -> Result<(), EffectError> {
///         *angle += frame.dt_secs * std::f64::consts::TAU;
///         Ok(())
///     }
///
///     fn on_stop(&mut self, _angle: f64) -> Result<(), EffectError> {
///         Ok(())
///     }
/// }
/// ```
pub trait Effect: 'static {
    /// 每个效果实例独占的状态（粒子列表等）
    type State: 'static;

    /// 首次激活时调用一次，分配效果状态
    fn on_start(&mut self, ctx: &StartContext) -> Result<Self::State, EffectError>;

    /// 推进并渲染一帧
    fn on_frame(&mut self, state: &mut Self::State, frame: &FrameContext)
    -> Result<(), EffectError>;

    /// 销毁时调用，释放效果自有资源
    fn on_stop(&mut self, state: Self::State) -> Result<(), EffectError>;

    /// 视口尺寸变化（仅 `resize_reactive` 时调用）
    fn on_resize(
        &mut self,
        _state: &mut Self::State,
        _viewport: Viewport,
    ) -> Result<(), EffectError> {
        Ok(())
    }
}

/// 传给一次性效果的上下文
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireContext {
    /// 所属句柄
    pub handle: HandleId,
    /// 触发时的可见比例
    pub ratio: f64,
}

/// 一次性效果
pub trait OneShot: 'static {
    /// 首次可见时调用，整个生命周期内至多一次
    fn fire(self: Box<Self>, ctx: &FireContext) -> Result<(), EffectError>;
}

impl<F> OneShot for F
where
    F: FnOnce(&FireContext) -> Result<(), EffectError> + 'static,
{
    fn fire(self: Box<Self>, ctx: &FireContext) -> Result<(), EffectError> {
        (*self)(ctx)
    }
}
