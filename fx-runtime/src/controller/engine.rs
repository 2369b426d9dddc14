//! # Engine 模块
//!
//! 效果控制器：句柄表 + 每个句柄的状态机。
//!
//! ## 执行模型
//!
//! ```text
//! create / create_one_shot  -> 注册观察器，句柄进入 Paused（或 Disabled）
//! pump()                    -> 取出宿主信号：先应用可见性 / resize / 卸载，再执行帧步进
//! destroy / unload          -> 取消挂起的帧，on_stop，按注册顺序执行清理动作
//! ```
//!
//! 效果回调与清理动作的失败都在这里兜住：记日志、发 `Faulted` 事件，
//! 不会传播给 `create` / `destroy` 的调用方，也不会影响其他句柄。

use std::collections::BTreeMap;

use tracing::{debug, error, info, trace, warn};

use super::slot::{DynEffect, EffectSlot};
use super::{DisableReason, EffectState, HandleId, HandleInfo, HandleKind};
use crate::capability::CapabilityTier;
use crate::clock::FrameClock;
use crate::config::FxConfig;
use crate::effect::{Effect, FireContext, OneShot, StartContext, Viewport};
use crate::error::{EffectPhase, FxError};
use crate::event::ControllerEvent;
use crate::host::{Cleanup, FrameToken, Host, HostSignal, VisibilitySignal};
use crate::options::EffectOptions;

/// 句柄承载的行为
enum Behavior {
    /// 持续效果（状态在槽位内）
    Continuous(Box<dyn DynEffect>),
    /// 一次性效果，触发后为 `None`
    OneShot(Option<Box<dyn OneShot>>),
    /// 已销毁，效果与状态均已释放
    Released,
}

/// 句柄表中的条目
struct HandleEntry<T> {
    id: HandleId,
    kind: HandleKind,
    state: EffectState,
    /// 与目标的关联（非拥有，浏览器中是元素引用的克隆）
    target: Option<T>,
    behavior: Behavior,
    options: EffectOptions,
    /// 当前挂起的帧请求
    pending_frame: Option<FrameToken>,
    /// 回调失败后不再恢复运行
    faulted: bool,
    clock: FrameClock,
    /// 按注册顺序排列的清理动作
    cleanups: Vec<Cleanup>,
}

impl<T> HandleEntry<T> {
    fn info(&self) -> HandleInfo {
        let started = match &self.behavior {
            Behavior::Continuous(effect) => effect.is_started(),
            _ => false,
        };
        HandleInfo {
            id: self.id,
            kind: self.kind,
            state: self.state,
            started,
            faulted: self.faulted,
            pending_cleanups: self.cleanups.len(),
            frame_pending: self.pending_frame.is_some(),
            frames: self.clock.frames(),
        }
    }
}

/// 可见性门控的效果控制器
///
/// # 使用示例
///
/// ```ignore
/// let mut controller = EffectController::new(host, FxConfig::default());
/// let id = controller.create(Some(canvas), particles, EffectOptions::default());
///
/// // 宿主回调入队后
/// controller.pump();
///
/// // 页面卸载
/// controller.destroy_all();
/// ```
pub struct EffectController<H: Host> {
    host: H,
    config: FxConfig,
    tier: CapabilityTier,
    handles: BTreeMap<HandleId, HandleEntry<H::Target>>,
    next_handle_id: u64,
    next_frame_token: u64,
    events: Vec<ControllerEvent>,
}

impl<H: Host> std::fmt::Debug for EffectController<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectController")
            .field("tier", &self.tier)
            .field("handles", &self.handles.len())
            .field("live", &self.live_count())
            .finish()
    }
}

impl<H: Host> EffectController<H> {
    /// 创建控制器
    ///
    /// 设备档位在此时根据宿主提示计算一次。
    pub fn new(host: H, config: FxConfig) -> Self {
        let hints = host.device_hints();
        let tier = CapabilityTier::classify(hints, config.capability);
        info!(
            cores = ?hints.logical_cores,
            memory_gb = ?hints.memory_gb,
            %tier,
            "效果控制器已创建"
        );
        Self {
            host,
            config,
            tier,
            handles: BTreeMap::new(),
            next_handle_id: 1,
            next_frame_token: 1,
            events: Vec::new(),
        }
    }

    /// 生成下一个句柄 ID
    fn next_handle_id(&mut self) -> HandleId {
        let id = HandleId::new(self.next_handle_id);
        self.next_handle_id += 1;
        id
    }

    // ========== 创建 ==========

    /// 创建持续效果
    ///
    /// 目标缺失、或尊重减少动态效果偏好且用户开启了该偏好时，返回永久禁用的句柄。
    /// 此方法从不失败。
    pub fn create<E: Effect>(
        &mut self,
        target: Option<H::Target>,
        effect: E,
        options: EffectOptions,
    ) -> HandleId {
        let behavior = Behavior::Continuous(Box::new(EffectSlot::new(effect)));
        self.register(HandleKind::Continuous, target, behavior, options)
    }

    /// 创建一次性效果
    ///
    /// 首次可见时调用 `fire`，之后句柄进入 `Fired` 并立即断开观察器。
    pub fn create_one_shot<F: OneShot>(
        &mut self,
        target: Option<H::Target>,
        fire: F,
        options: EffectOptions,
    ) -> HandleId {
        let behavior = Behavior::OneShot(Some(Box::new(fire)));
        self.register(HandleKind::OneShot, target, behavior, options)
    }

    fn register(
        &mut self,
        kind: HandleKind,
        target: Option<H::Target>,
        behavior: Behavior,
        options: EffectOptions,
    ) -> HandleId {
        let id = self.next_handle_id();
        let (options, invalid) = options.normalized();
        if let Some(err) = invalid {
            warn!(handle = %id, "{err}");
        }

        let mut entry = HandleEntry {
            id,
            kind,
            state: EffectState::Paused,
            target: None,
            behavior,
            options,
            pending_frame: None,
            faulted: false,
            clock: FrameClock::from_config(&self.config),
            cleanups: Vec::new(),
        };

        let host = &self.host;
        let Some(target) = target.filter(|t| host.is_attached(t)) else {
            warn!(handle = %id, "{}", FxError::MissingTarget { handle: id });
            entry.state = EffectState::Disabled;
            self.events
                .push(ControllerEvent::Disabled(id, DisableReason::MissingTarget));
            self.handles.insert(id, entry);
            return id;
        };

        if options.respect_reduced_motion && self.host.prefers_reduced_motion() {
            info!(handle = %id, "用户偏好减少动态效果，句柄已禁用");
            entry.state = EffectState::Disabled;
            entry.target = Some(target);
            self.events
                .push(ControllerEvent::Disabled(id, DisableReason::ReducedMotion));
            self.handles.insert(id, entry);
            return id;
        }

        match self
            .host
            .observe_visibility(id, &target, options.visibility_threshold)
        {
            Ok(cleanup) => entry.cleanups.push(cleanup),
            Err(source) => {
                let err = FxError::ObserverUnavailable { handle: id, source };
                warn!(handle = %id, "{err}");
                entry.state = EffectState::Disabled;
                entry.target = Some(target);
                self.events.push(ControllerEvent::Faulted(err));
                self.events.push(ControllerEvent::Disabled(
                    id,
                    DisableReason::ObserverUnavailable,
                ));
                self.handles.insert(id, entry);
                return id;
            }
        }

        if options.resize_reactive {
            match self.host.listen_resize(id, self.config.resize_throttle_ms) {
                Ok(cleanup) => entry.cleanups.push(cleanup),
                Err(source) => {
                    let err = FxError::ResizeUnavailable { handle: id, source };
                    warn!(handle = %id, "{err}");
                    self.events.push(ControllerEvent::Faulted(err));
                }
            }
        }

        debug!(handle = %id, ?kind, threshold = options.visibility_threshold, "句柄已创建");
        entry.target = Some(target);
        self.events.push(ControllerEvent::Created(id));
        self.handles.insert(id, entry);
        id
    }

    // ========== 信号处理 ==========

    /// 取出并应用宿主队列中的全部信号
    ///
    /// 同一批信号中，可见性 / resize / 卸载先于帧步进应用。
    /// 返回应用的信号数量。
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let signals = self.host.take_signals();
            if signals.is_empty() {
                break;
            }
            let (frames, others): (Vec<_>, Vec<_>) =
                signals.into_iter().partition(HostSignal::is_frame);
            for signal in others.into_iter().chain(frames) {
                self.handle_signal(signal);
                applied += 1;
            }
        }
        applied
    }

    /// 应用单个信号
    pub fn handle_signal(&mut self, signal: HostSignal) {
        match signal {
            HostSignal::Visibility { handle, signal } => self.on_visibility(handle, signal),
            HostSignal::Resize { handle, viewport } => self.on_resize(handle, viewport),
            HostSignal::Frame {
                handle,
                token,
                timestamp_ms,
            } => self.step(handle, token, timestamp_ms),
            HostSignal::Unload => {
                info!("页面卸载，销毁全部句柄");
                self.destroy_all();
            }
        }
    }

    fn on_visibility(&mut self, id: HandleId, signal: VisibilitySignal) {
        let Some(entry) = self.handles.get(&id) else {
            trace!(handle = %id, "未知句柄的可见性信号");
            return;
        };
        let visible = signal.passes(entry.options.visibility_threshold);
        match (entry.state, entry.kind, visible) {
            (EffectState::Paused, HandleKind::Continuous, true) => self.activate(id),
            (EffectState::Paused, HandleKind::OneShot, true) => self.fire(id, signal.ratio),
            (EffectState::Running, _, false) => self.pause(id),
            _ => {}
        }
    }

    fn on_resize(&mut self, id: HandleId, viewport: Viewport) {
        let Some(entry) = self.handles.get_mut(&id) else {
            return;
        };
        if !entry.options.resize_reactive
            || matches!(entry.state, EffectState::Disabled | EffectState::Destroyed)
        {
            return;
        }
        if let Behavior::Continuous(effect) = &mut entry.behavior {
            if let Err(err) = effect.resize(viewport) {
                report_effect_fault(&mut self.events, id, EffectPhase::Resize, err.message);
            }
        }
    }

    /// Paused -> Running
    fn activate(&mut self, id: HandleId) {
        let tier = self.tier;
        let Some(entry) = self.handles.get_mut(&id) else {
            return;
        };
        if entry.faulted || entry.state != EffectState::Paused {
            return;
        }
        let Behavior::Continuous(effect) = &mut entry.behavior else {
            return;
        };

        if !effect.is_started() {
            match effect.start(&StartContext { handle: id, tier }) {
                Ok(()) => {
                    debug!(handle = %id, %tier, "效果已启动");
                    self.events.push(ControllerEvent::Started(id));
                }
                Err(err) => {
                    entry.faulted = true;
                    report_effect_fault(&mut self.events, id, EffectPhase::Start, err.message);
                    return;
                }
            }
        }

        entry.state = EffectState::Running;
        entry.clock.resume();
        self.events.push(ControllerEvent::Resumed(id));

        if entry.pending_frame.is_none() {
            let token = FrameToken(self.next_frame_token);
            self.next_frame_token += 1;
            if let Err(source) = self.host.request_frame(id, token) {
                entry.state = EffectState::Paused;
                let err = FxError::FrameUnavailable { handle: id, source };
                warn!(handle = %id, "{err}");
                self.events.push(ControllerEvent::Faulted(err));
                self.events.push(ControllerEvent::Paused(id));
                return;
            }
            entry.pending_frame = Some(token);
        }
    }

    /// Running -> Paused（保留效果状态，不调用 on_stop）
    fn pause(&mut self, id: HandleId) {
        let Some(entry) = self.handles.get_mut(&id) else {
            return;
        };
        if entry.state != EffectState::Running {
            return;
        }
        entry.state = EffectState::Paused;
        if entry.pending_frame.take().is_some() {
            self.host.cancel_frame(id);
        }
        debug!(handle = %id, frames = entry.clock.frames(), "效果已暂停");
        self.events.push(ControllerEvent::Paused(id));
    }

    /// 一次帧步进
    fn step(&mut self, id: HandleId, token: FrameToken, timestamp_ms: f64) {
        let Some(entry) = self.handles.get_mut(&id) else {
            return;
        };
        if entry.pending_frame != Some(token) {
            trace!(handle = %id, ?token, "丢弃过期的帧回调");
            return;
        }
        entry.pending_frame = None;

        // 在步进开始处检查，避免暂停后多跑一帧
        if entry.state != EffectState::Running {
            return;
        }
        let Behavior::Continuous(effect) = &mut entry.behavior else {
            return;
        };

        let frame = entry.clock.tick(timestamp_ms);
        if let Err(err) = effect.frame(&frame) {
            entry.state = EffectState::Paused;
            entry.faulted = true;
            report_effect_fault(&mut self.events, id, EffectPhase::Frame, err.message);
            self.events.push(ControllerEvent::Paused(id));
            return;
        }

        let next = FrameToken(self.next_frame_token);
        self.next_frame_token += 1;
        match self.host.request_frame(id, next) {
            Ok(()) => entry.pending_frame = Some(next),
            Err(source) => {
                entry.state = EffectState::Paused;
                let err = FxError::FrameUnavailable { handle: id, source };
                warn!(handle = %id, "{err}");
                self.events.push(ControllerEvent::Faulted(err));
                self.events.push(ControllerEvent::Paused(id));
            }
        }
    }

    /// Paused -> Fired（一次性效果）
    fn fire(&mut self, id: HandleId, ratio: f64) {
        let Some(entry) = self.handles.get_mut(&id) else {
            return;
        };
        if entry.state != EffectState::Paused {
            return;
        }
        let Behavior::OneShot(slot) = &mut entry.behavior else {
            return;
        };
        let Some(fire) = slot.take() else {
            return;
        };

        entry.state = EffectState::Fired;
        if let Err(err) = fire.fire(&FireContext { handle: id, ratio }) {
            report_effect_fault(&mut self.events, id, EffectPhase::Fire, err.message);
        }
        debug!(handle = %id, ratio, "一次性效果已触发");
        self.events.push(ControllerEvent::Fired(id));

        // 触发后立即自清理
        let cleanups = std::mem::take(&mut entry.cleanups);
        run_cleanups(&mut self.events, id, cleanups);
    }

    // ========== 销毁 ==========

    /// 销毁句柄
    ///
    /// 返回前取消挂起的帧并调用 [`Host::release`]，此后该句柄不会再有任何帧步进或清理动作。
    /// 对已销毁或未知的句柄是空操作。
    ///
    /// 条目以 `Destroyed` 状态保留在句柄表中（只剩 ID 与状态，效果和目标都已释放），
    /// 以便销毁后仍能查询状态；句柄表随控制器一起释放，适合单页面的生命周期。
    pub fn destroy(&mut self, id: HandleId) {
        let Some(entry) = self.handles.get_mut(&id) else {
            trace!(handle = %id, "销毁未知句柄");
            return;
        };
        if entry.state == EffectState::Destroyed {
            return;
        }

        if entry.pending_frame.take().is_some() {
            self.host.cancel_frame(id);
        }

        let behavior = std::mem::replace(&mut entry.behavior, Behavior::Released);
        if let Behavior::Continuous(mut effect) = behavior {
            if let Some(Err(err)) = effect.stop() {
                report_effect_fault(&mut self.events, id, EffectPhase::Stop, err.message);
            }
        }

        let cleanups = std::mem::take(&mut entry.cleanups);
        run_cleanups(&mut self.events, id, cleanups);

        entry.state = EffectState::Destroyed;
        entry.target = None;
        self.host.release(id);
        debug!(handle = %id, "句柄已销毁");
        self.events.push(ControllerEvent::Destroyed(id));
    }

    /// 按创建顺序销毁全部句柄（页面卸载时调用）
    pub fn destroy_all(&mut self) {
        for id in self.handle_ids() {
            self.destroy(id);
        }
    }

    // ========== 查询方法 ==========

    /// 句柄是否正在运行
    pub fn is_running(&self, id: HandleId) -> bool {
        self.state(id) == Some(EffectState::Running)
    }

    /// 句柄状态
    pub fn state(&self, id: HandleId) -> Option<EffectState> {
        self.handles.get(&id).map(|entry| entry.state)
    }

    /// 句柄快照
    pub fn handle(&self, id: HandleId) -> Option<HandleInfo> {
        self.handles.get(&id).map(HandleEntry::info)
    }

    /// 句柄关联的目标（销毁后为 `None`）
    pub fn target(&self, id: HandleId) -> Option<&H::Target> {
        self.handles.get(&id).and_then(|entry| entry.target.as_ref())
    }

    /// 所有句柄 ID（按创建顺序）
    pub fn handle_ids(&self) -> Vec<HandleId> {
        self.handles.keys().copied().collect()
    }

    /// 未销毁的句柄数量
    pub fn live_count(&self) -> usize {
        self.handles
            .values()
            .filter(|entry| entry.state != EffectState::Destroyed)
            .count()
    }

    /// 正在运行的句柄数量
    pub fn running_count(&self) -> usize {
        self.handles
            .values()
            .filter(|entry| entry.state == EffectState::Running)
            .count()
    }

    /// 设备能力档位
    pub fn tier(&self) -> CapabilityTier {
        self.tier
    }

    /// 运行时配置
    pub fn config(&self) -> &FxConfig {
        &self.config
    }

    /// 配置中的默认选项
    pub fn default_options(&self) -> EffectOptions {
        self.config.defaults
    }

    /// 宿主
    pub fn host(&self) -> &H {
        &self.host
    }

    /// 取出并清空事件队列
    pub fn drain_events(&mut self) -> Vec<ControllerEvent> {
        std::mem::take(&mut self.events)
    }
}

impl<H: Host> Drop for EffectController<H> {
    fn drop(&mut self) {
        self.destroy_all();
    }
}

/// 记录效果回调失败
fn report_effect_fault(
    events: &mut Vec<ControllerEvent>,
    handle: HandleId,
    phase: EffectPhase,
    message: String,
) {
    let err = FxError::EffectFault {
        handle,
        phase,
        message,
    };
    error!(%handle, %phase, "{err}");
    events.push(ControllerEvent::Faulted(err));
}

/// 按注册顺序执行清理动作，单个失败不影响其余
fn run_cleanups(events: &mut Vec<ControllerEvent>, handle: HandleId, cleanups: Vec<Cleanup>) {
    for cleanup in cleanups {
        let label = cleanup.label().to_string();
        if let Err(source) = cleanup.run() {
            let err = FxError::CleanupFault {
                handle,
                label,
                message: source.to_string(),
            };
            warn!(%handle, "{err}");
            events.push(ControllerEvent::Faulted(err));
        }
    }
}
