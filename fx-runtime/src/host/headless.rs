//! # Headless 宿主
//!
//! 纯内存宿主，不依赖浏览器。用于测试、`fx-sim` 模拟器与 `xtask scenario-check`。
//!
//! `HeadlessHost` 可以廉价克隆，所有克隆共享同一份内部状态：
//! 把一份交给控制器，另一份留在外面驱动滚动、帧和卸载。
//!
//! ```rust,ignore
//! let host = HeadlessHost::new();
//! let mut controller = EffectController::new(host.clone(), FxConfig::default());
//! let id = controller.create(Some("hero".to_string()), effect, EffectOptions::default());
//!
//! host.show("hero", 1.0);
//! controller.pump();
//! host.advance_frame(16.0);
//! controller.pump();
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::rc::Rc;

use super::{Cleanup, FrameToken, Host, HostSignal, VisibilitySignal};
use crate::capability::DeviceHints;
use crate::controller::HandleId;
use crate::effect::Viewport;
use crate::error::HostError;

/// 已注册的观察器
#[derive(Debug, Clone)]
struct ObserverRecord {
    target: String,
    threshold: f64,
}

#[derive(Debug, Default)]
struct HeadlessState {
    reduced_motion: bool,
    hints: DeviceHints,
    detached: HashSet<String>,
    observers_unsupported: bool,
    observers: BTreeMap<HandleId, ObserverRecord>,
    resize_listeners: BTreeSet<HandleId>,
    pending_frames: BTreeMap<HandleId, FrameToken>,
    frame_requests: u64,
    duplicate_frame_requests: u64,
    failing_cleanups: HashSet<String>,
    cleanup_log: Vec<(HandleId, String)>,
    released: Vec<HandleId>,
    signals: VecDeque<HostSignal>,
}

/// 纯内存宿主
#[derive(Debug, Clone, Default)]
pub struct HeadlessHost {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessHost {
    /// 创建宿主（允许动态效果，设备提示为空）
    pub fn new() -> Self {
        Self::default()
    }

    // ========== 环境设置 ==========

    /// 设置减少动态效果偏好
    pub fn with_reduced_motion(self, reduced: bool) -> Self {
        self.state.borrow_mut().reduced_motion = reduced;
        self
    }

    /// 设置设备提示
    pub fn with_hints(self, hints: DeviceHints) -> Self {
        self.state.borrow_mut().hints = hints;
        self
    }

    /// 模拟不支持可见性观察器的环境
    pub fn without_observers(self) -> Self {
        self.state.borrow_mut().observers_unsupported = true;
        self
    }

    /// 修改减少动态效果偏好（只影响之后创建的句柄）
    pub fn set_reduced_motion(&self, reduced: bool) {
        self.state.borrow_mut().reduced_motion = reduced;
    }

    /// 把目标从文档中移除
    pub fn detach(&self, target: &str) {
        self.state.borrow_mut().detached.insert(target.to_string());
    }

    /// 让指定名称的清理动作失败
    pub fn fail_cleanup(&self, label: &str) {
        self.state
            .borrow_mut()
            .failing_cleanups
            .insert(label.to_string());
    }

    // ========== 事件注入 ==========

    /// 目标以给定比例进入视口
    pub fn show(&self, target: &str, ratio: f64) {
        self.scroll(target, VisibilitySignal::visible(ratio));
    }

    /// 目标离开视口
    pub fn hide(&self, target: &str) {
        self.scroll(target, VisibilitySignal::hidden());
    }

    /// 向观察该目标的所有观察器投递可见性信号
    ///
    /// 已断开的观察器不会再收到信号。
    pub fn scroll(&self, target: &str, signal: VisibilitySignal) {
        let mut state = self.state.borrow_mut();
        let handles: Vec<HandleId> = state
            .observers
            .iter()
            .filter(|(_, record)| record.target == target)
            .map(|(handle, _)| *handle)
            .collect();
        for handle in handles {
            state
                .signals
                .push_back(HostSignal::Visibility { handle, signal });
        }
    }

    /// 视口尺寸变化，投递给所有 resize 监听器
    pub fn resize(&self, viewport: Viewport) {
        let mut state = self.state.borrow_mut();
        let handles: Vec<HandleId> = state.resize_listeners.iter().copied().collect();
        for handle in handles {
            state
                .signals
                .push_back(HostSignal::Resize { handle, viewport });
        }
    }

    /// 触发一次显示刷新：所有挂起的帧请求各收到一次帧回调
    pub fn advance_frame(&self, timestamp_ms: f64) {
        let mut state = self.state.borrow_mut();
        let pending = std::mem::take(&mut state.pending_frames);
        for (handle, token) in pending {
            state.signals.push_back(HostSignal::Frame {
                handle,
                token,
                timestamp_ms,
            });
        }
    }

    /// 页面卸载
    pub fn unload(&self) {
        self.state.borrow_mut().signals.push_back(HostSignal::Unload);
    }

    /// 直接投递一个信号
    pub fn push_signal(&self, signal: HostSignal) {
        self.state.borrow_mut().signals.push_back(signal);
    }

    // ========== 查询 ==========

    /// 当前注册的观察器数量
    pub fn observer_count(&self) -> usize {
        self.state.borrow().observers.len()
    }

    /// 当前注册的 resize 监听器数量
    pub fn resize_listener_count(&self) -> usize {
        self.state.borrow().resize_listeners.len()
    }

    /// 句柄是否有挂起的帧请求
    pub fn has_pending_frame(&self, handle: HandleId) -> bool {
        self.state.borrow().pending_frames.contains_key(&handle)
    }

    /// 挂起的帧请求数量
    pub fn pending_frame_count(&self) -> usize {
        self.state.borrow().pending_frames.len()
    }

    /// 累计帧请求次数
    pub fn frame_requests(&self) -> u64 {
        self.state.borrow().frame_requests
    }

    /// 在已有挂起请求时再次请求的次数（应当始终为 0）
    pub fn duplicate_frame_requests(&self) -> u64 {
        self.state.borrow().duplicate_frame_requests
    }

    /// 已执行的清理动作（按执行顺序）
    pub fn cleanup_log(&self) -> Vec<(HandleId, String)> {
        self.state.borrow().cleanup_log.clone()
    }

    /// 已释放的句柄（按释放顺序）
    pub fn released(&self) -> Vec<HandleId> {
        self.state.borrow().released.clone()
    }

    /// 观察器的阈值
    pub fn observer_threshold(&self, handle: HandleId) -> Option<f64> {
        self.state
            .borrow()
            .observers
            .get(&handle)
            .map(|record| record.threshold)
    }

    /// 队列中尚未被取走的信号数量
    pub fn queued_signals(&self) -> usize {
        self.state.borrow().signals.len()
    }
}

impl Host for HeadlessHost {
    type Target = String;

    fn is_attached(&self, target: &String) -> bool {
        !self.state.borrow().detached.contains(target)
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.state.borrow().reduced_motion
    }

    fn device_hints(&self) -> DeviceHints {
        self.state.borrow().hints
    }

    fn observe_visibility(
        &mut self,
        handle: HandleId,
        target: &String,
        threshold: f64,
    ) -> Result<Cleanup, HostError> {
        let mut state = self.state.borrow_mut();
        if state.observers_unsupported {
            return Err(HostError::Unsupported {
                capability: "IntersectionObserver".to_string(),
            });
        }
        state.observers.insert(
            handle,
            ObserverRecord {
                target: target.clone(),
                threshold,
            },
        );
        drop(state);

        let shared = Rc::clone(&self.state);
        Ok(Cleanup::new("observer", move || {
            record_cleanup(&shared, handle, "observer", |state| {
                state.observers.remove(&handle);
            })
        }))
    }

    fn listen_resize(&mut self, handle: HandleId, _throttle_ms: f64) -> Result<Cleanup, HostError> {
        self.state.borrow_mut().resize_listeners.insert(handle);

        let shared = Rc::clone(&self.state);
        Ok(Cleanup::new("resize", move || {
            record_cleanup(&shared, handle, "resize", |state| {
                state.resize_listeners.remove(&handle);
            })
        }))
    }

    fn request_frame(&mut self, handle: HandleId, token: FrameToken) -> Result<(), HostError> {
        let mut state = self.state.borrow_mut();
        state.frame_requests += 1;
        if state.pending_frames.insert(handle, token).is_some() {
            state.duplicate_frame_requests += 1;
        }
        Ok(())
    }

    fn cancel_frame(&mut self, handle: HandleId) {
        self.state.borrow_mut().pending_frames.remove(&handle);
    }

    fn release(&mut self, handle: HandleId) {
        let mut state = self.state.borrow_mut();
        state.pending_frames.remove(&handle);
        state.released.push(handle);
    }

    fn take_signals(&mut self) -> Vec<HostSignal> {
        self.state.borrow_mut().signals.drain(..).collect()
    }
}

/// 执行一次清理并记录；被标记为失败的清理动作返回错误且不移除注册
fn record_cleanup(
    shared: &Rc<RefCell<HeadlessState>>,
    handle: HandleId,
    label: &str,
    remove: impl FnOnce(&mut HeadlessState),
) -> Result<(), HostError> {
    let mut state = shared.borrow_mut();
    state.cleanup_log.push((handle, label.to_string()));
    if state.failing_cleanups.contains(label) {
        return Err(HostError::Listener {
            message: format!("移除 {label} 失败"),
        });
    }
    remove(&mut *state);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signals_only_reach_registered_observers() {
        let mut host = HeadlessHost::new();
        let handle = HandleId::new(1);
        let cleanup = host
            .observe_visibility(handle, &"hero".to_string(), 0.0)
            .unwrap();

        host.show("hero", 1.0);
        host.show("footer", 1.0);
        assert_eq!(host.take_signals().len(), 1);

        cleanup.run().unwrap();
        host.show("hero", 1.0);
        assert!(host.take_signals().is_empty());
        assert_eq!(host.observer_count(), 0);
    }

    #[test]
    fn test_frame_requests_are_consumed_by_refresh() {
        let mut host = HeadlessHost::new();
        let handle = HandleId::new(7);
        host.request_frame(handle, FrameToken(1)).unwrap();
        assert!(host.has_pending_frame(handle));

        host.advance_frame(16.0);
        assert!(!host.has_pending_frame(handle));
        assert_eq!(
            host.take_signals(),
            vec![HostSignal::Frame {
                handle,
                token: FrameToken(1),
                timestamp_ms: 16.0
            }]
        );
    }

    #[test]
    fn test_failing_cleanup_is_logged() {
        let mut host = HeadlessHost::new();
        host.fail_cleanup("resize");
        let cleanup = host.listen_resize(HandleId::new(2), 150.0).unwrap();
        assert!(cleanup.run().is_err());
        assert_eq!(host.cleanup_log(), vec![(HandleId::new(2), "resize".to_string())]);
    }

    #[test]
    fn test_unsupported_observers() {
        let mut host = HeadlessHost::new().without_observers();
        let result = host.observe_visibility(HandleId::new(1), &"hero".to_string(), 0.0);
        assert!(matches!(result, Err(HostError::Unsupported { .. })));
    }
}
