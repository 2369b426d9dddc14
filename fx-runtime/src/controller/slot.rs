//! # Slot 模块
//!
//! 把不同 `Effect::State` 的效果擦除成统一的 trait object，
//! 每个槽位独占自己的效果状态。

use crate::clock::FrameContext;
use crate::effect::{Effect, StartContext, Viewport};
use crate::error::EffectError;

/// 类型擦除后的效果
pub(crate) trait DynEffect {
    /// 分配效果状态（仅首次激活）
    fn start(&mut self, ctx: &StartContext) -> Result<(), EffectError>;

    /// 推进一帧；尚未启动时什么也不做
    fn frame(&mut self, frame: &FrameContext) -> Result<(), EffectError>;

    /// 视口尺寸变化；尚未启动时什么也不做
    fn resize(&mut self, viewport: Viewport) -> Result<(), EffectError>;

    /// 释放效果状态
    ///
    /// 从未启动过时返回 `None`，`on_stop` 不会被调用。
    fn stop(&mut self) -> Option<Result<(), EffectError>>;

    /// 是否已分配状态
    fn is_started(&self) -> bool;
}

/// 效果槽位
pub(crate) struct EffectSlot<E: Effect> {
    effect: E,
    state: Option<E::State>,
}

impl<E: Effect> EffectSlot<E> {
    pub(crate) fn new(effect: E) -> Self {
        Self {
            effect,
            state: None,
        }
    }
}

impl<E: Effect> DynEffect for EffectSlot<E> {
    fn start(&mut self, ctx: &StartContext) -> Result<(), EffectError> {
        if self.state.is_some() {
            return Ok(());
        }
        let state = self.effect.on_start(ctx)?;
        self.state = Some(state);
        Ok(())
    }

    fn frame(&mut self, frame: &FrameContext) -> Result<(), EffectError> {
        match self.state.as_mut() {
            Some(state) => self.effect.on_frame(state, frame),
            None => Ok(()),
        }
    }

    fn resize(&mut self, viewport: Viewport) -> Result<(), EffectError> {
        match self.state.as_mut() {
            Some(state) => self.effect.on_resize(state, viewport),
            None => Ok(()),
        }
    }

    fn stop(&mut self) -> Option<Result<(), EffectError>> {
        let state = self.state.take()?;
        Some(self.effect.on_stop(state))
    }

    fn is_started(&self) -> bool {
        self.state.is_some()
    }
}
