//! # Host 模块
//!
//! 控制器与宿主环境（浏览器文档 / 视口）之间的唯一边界。
//!
//! ```text
//! Host                              EffectController
//!   │                                     │
//!   │──── HostSignal (队列) ────────────►│ pump()
//!   │                                     │
//!   │◄─── observe / request_frame / ... ──│
//!   │                                     │
//! ```
//!
//! 宿主在自己的回调里只做一件事：把 [`HostSignal`] 放进队列。
//! 控制器在 `pump()` 中统一取出并应用，保证状态迁移发生在下一次帧步进之前，
//! 而不是在某一帧执行到一半时同步发生。

mod headless;

pub use headless::HeadlessHost;

use serde::{Deserialize, Serialize};

use crate::capability::DeviceHints;
use crate::controller::HandleId;
use crate::effect::Viewport;
use crate::error::HostError;

/// 可见性信号
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VisibilitySignal {
    /// 目标是否与视口相交
    pub intersecting: bool,
    /// 相交比例 (0.0 - 1.0)
    pub ratio: f64,
}

impl VisibilitySignal {
    /// 目标进入视口
    pub fn visible(ratio: f64) -> Self {
        Self {
            intersecting: true,
            ratio,
        }
    }

    /// 目标离开视口
    pub fn hidden() -> Self {
        Self {
            intersecting: false,
            ratio: 0.0,
        }
    }

    /// 按阈值判断是否可见
    pub fn passes(&self, threshold: f64) -> bool {
        self.intersecting && self.ratio >= threshold
    }
}

/// 帧请求令牌
///
/// 由控制器在每次请求帧时分配，宿主在帧回调中原样带回。
/// 令牌与句柄当前挂起的请求不一致的帧回调会被丢弃。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameToken(pub u64);

/// 宿主向控制器传递的信号
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HostSignal {
    /// 可见性观察器回调
    Visibility {
        handle: HandleId,
        signal: VisibilitySignal,
    },

    /// 节流后的 resize 回调
    Resize { handle: HandleId, viewport: Viewport },

    /// 帧回调（时间戳为毫秒，与 `requestAnimationFrame` 一致）
    Frame {
        handle: HandleId,
        token: FrameToken,
        timestamp_ms: f64,
    },

    /// 页面卸载
    Unload,
}

impl HostSignal {
    /// 是否为帧回调
    pub fn is_frame(&self) -> bool {
        matches!(self, Self::Frame { .. })
    }
}

/// 清理动作
///
/// 注册监听器 / 观察器时由宿主返回，归句柄所有，销毁时按注册顺序执行且只执行一次。
pub struct Cleanup {
    label: String,
    action: Box<dyn FnOnce() -> Result<(), HostError>>,
}

impl Cleanup {
    /// 创建清理动作
    pub fn new(
        label: impl Into<String>,
        action: impl FnOnce() -> Result<(), HostError> + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            action: Box::new(action),
        }
    }

    /// 清理动作名称（用于日志）
    pub fn label(&self) -> &str {
        &self.label
    }

    /// 执行清理动作（消耗自身，保证至多执行一次）
    pub fn run(self) -> Result<(), HostError> {
        (self.action)()
    }
}

impl std::fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cleanup")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// 宿主环境接口
///
/// 所有方法都是同步的；观察器、监听器和帧回调通过 `take_signals` 以队列形式回到控制器。
pub trait Host {
    /// 目标元素类型（浏览器中为 `web_sys::Element`）
    type Target;

    /// 目标是否已挂载到文档
    fn is_attached(&self, target: &Self::Target) -> bool;

    /// 用户是否偏好减少动态效果
    fn prefers_reduced_motion(&self) -> bool;

    /// 设备能力提示
    fn device_hints(&self) -> DeviceHints;

    /// 在目标上注册可见性观察器
    fn observe_visibility(
        &mut self,
        handle: HandleId,
        target: &Self::Target,
        threshold: f64,
    ) -> Result<Cleanup, HostError>;

    /// 注册节流后的 resize 监听器
    fn listen_resize(&mut self, handle: HandleId, throttle_ms: f64) -> Result<Cleanup, HostError>;

    /// 请求下一帧回调，帧回调需带回 `token`
    fn request_frame(&mut self, handle: HandleId, token: FrameToken) -> Result<(), HostError>;

    /// 取消尚未触发的帧回调
    fn cancel_frame(&mut self, handle: HandleId);

    /// 句柄销毁的最后一步
    ///
    /// 释放宿主代句柄持有、但没有登记为清理动作的资源，
    /// 例如一次性效果触发后自行启动的动画。每个句柄至多调用一次。
    fn release(&mut self, _handle: HandleId) {}

    /// 取出队列中的所有信号
    fn take_signals(&mut self) -> Vec<HostSignal>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_visibility_threshold() {
        assert!(VisibilitySignal::visible(0.5).passes(0.3));
        assert!(!VisibilitySignal::visible(0.2).passes(0.3));
        assert!(VisibilitySignal::visible(0.0).passes(0.0));
        assert!(!VisibilitySignal::hidden().passes(0.0));
    }

    #[test]
    fn test_cleanup_runs_once() {
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let cleanup = Cleanup::new("observer", move || {
            counter.set(counter.get() + 1);
            Ok(())
        });
        assert_eq!(cleanup.label(), "observer");
        cleanup.run().unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_signal_serialization() {
        let signal = HostSignal::Frame {
            handle: HandleId::new(1),
            token: FrameToken(4),
            timestamp_ms: 16.0,
        };
        let json = serde_json::to_string(&signal).unwrap();
        let back: HostSignal = serde_json::from_str(&json).unwrap();
        assert_eq!(signal, back);
        assert!(back.is_frame());
    }
}
