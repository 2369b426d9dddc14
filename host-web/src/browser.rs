//! # Browser 宿主
//!
//! 用浏览器 API 实现 [`Host`]：
//!
//! - 可见性：`IntersectionObserver`
//! - 帧：`requestAnimationFrame`（`gloo-render`，丢弃句柄即取消）
//! - resize：`window` 的 `resize` 事件，经 [`ResizeThrottle`] 节流
//! - 偏好与设备：`matchMedia`、`navigator.hardwareConcurrency`、`navigator.deviceMemory`
//!
//! 浏览器回调只把信号放进 [`Mailbox`]，然后尝试借用控制器执行 `pump()`；
//! 控制器正忙时信号留在队列中，由正在进行的 `pump()` 在下一轮取走。

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

use fx_runtime::{
    Cleanup, DeviceHints, EffectController, FrameToken, HandleId, Host, HostError, HostSignal,
    ResizeThrottle, ThrottleDecision, Viewport, VisibilitySignal,
};
use gloo_events::EventListener;
use gloo_render::{AnimationFrame, request_animation_frame};
use gloo_timers::callback::Timeout;
use js_sys::{Array, Reflect};
use tracing::{debug, trace, warn};
use wasm_bindgen::prelude::*;
use web_sys::{
    Element, IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit, Window,
};

use crate::effects::Animations;

/// 浏览器中的控制器
pub type BrowserController = EffectController<BrowserHost>;

/// 宿主信号队列
///
/// 浏览器回调与控制器之间唯一的共享状态。
#[derive(Default)]
pub struct Mailbox {
    queue: RefCell<VecDeque<HostSignal>>,
    controller: RefCell<Weak<RefCell<BrowserController>>>,
}

impl Mailbox {
    /// 关联控制器（只保存弱引用）
    pub fn attach(&self, controller: &Rc<RefCell<BrowserController>>) {
        *self.controller.borrow_mut() = Rc::downgrade(controller);
    }

    /// 投递信号并尝试立即应用
    pub fn post(&self, signal: HostSignal) {
        self.queue.borrow_mut().push_back(signal);
        self.flush();
    }

    /// 控制器空闲时执行一次 `pump()`
    pub fn flush(&self) {
        let controller = self.controller.borrow().upgrade();
        let Some(controller) = controller else {
            return;
        };
        match controller.try_borrow_mut() {
            Ok(mut controller) => {
                controller.pump();
            }
            Err(_) => trace!("控制器正忙，信号留待本轮 pump 处理"),
        }
    }

    fn take(&self) -> Vec<HostSignal> {
        self.queue.borrow_mut().drain(..).collect()
    }
}

/// 浏览器宿主
pub struct BrowserHost {
    window: Window,
    mailbox: Rc<Mailbox>,
    /// 每个句柄至多一个挂起的帧，回调触发后在 `take_signals` 中移除
    frames: HashMap<HandleId, (FrameToken, AnimationFrame)>,
    animations: Animations,
}

impl BrowserHost {
    /// 创建宿主
    pub fn new(window: Window, mailbox: Rc<Mailbox>) -> Self {
        Self {
            window,
            mailbox,
            frames: HashMap::new(),
            animations: Animations::default(),
        }
    }

    /// 一次性效果触发后启动的动画，销毁句柄时一并取消
    pub fn animations(&self) -> Animations {
        self.animations.clone()
    }
}

impl Host for BrowserHost {
    type Target = Element;

    fn is_attached(&self, target: &Element) -> bool {
        target.is_connected()
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.window
            .match_media("(prefers-reduced-motion: reduce)")
            .ok()
            .flatten()
            .is_some_and(|query| query.matches())
    }

    fn device_hints(&self) -> DeviceHints {
        let navigator = self.window.navigator();
        let cores = navigator.hardware_concurrency();
        let logical_cores = (cores.is_finite() && cores >= 1.0).then_some(cores as u32);
        // deviceMemory 只在部分浏览器上存在
        let memory_gb = Reflect::get(&navigator, &JsValue::from_str("deviceMemory"))
            .ok()
            .and_then(|value| value.as_f64());
        DeviceHints::new(logical_cores, memory_gb)
    }

    fn observe_visibility(
        &mut self,
        handle: HandleId,
        target: &Element,
        threshold: f64,
    ) -> Result<Cleanup, HostError> {
        let supported = Reflect::has(&self.window, &JsValue::from_str("IntersectionObserver"))
            .unwrap_or(false);
        if !supported {
            return Err(HostError::Unsupported {
                capability: "IntersectionObserver".to_string(),
            });
        }

        let mailbox = Rc::clone(&self.mailbox);
        let callback = Closure::<dyn FnMut(Array, IntersectionObserver)>::new(
            move |entries: Array, _observer: IntersectionObserver| {
                for entry in entries.iter() {
                    let Ok(entry) = entry.dyn_into::<IntersectionObserverEntry>() else {
                        continue;
                    };
                    let signal = VisibilitySignal {
                        intersecting: entry.is_intersecting(),
                        ratio: entry.intersection_ratio(),
                    };
                    mailbox.post(HostSignal::Visibility { handle, signal });
                }
            },
        );

        let init = IntersectionObserverInit::new();
        init.set_threshold(&JsValue::from_f64(threshold));
        let observer = IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)
            .map_err(|err| HostError::Listener {
                message: js_message(&err),
            })?;
        observer.observe(target);
        debug!(%handle, threshold, "已注册可见性观察器");

        Ok(Cleanup::new("observer", move || {
            observer.disconnect();
            drop(callback);
            Ok(())
        }))
    }

    fn listen_resize(&mut self, handle: HandleId, throttle_ms: f64) -> Result<Cleanup, HostError> {
        let throttle = Rc::new(RefCell::new(ResizeThrottle::new(throttle_ms)));
        let trailing: Rc<RefCell<Option<Timeout>>> = Rc::default();

        let window = self.window.clone();
        let mailbox = Rc::clone(&self.mailbox);
        let timer_slot = Rc::clone(&trailing);
        let listener = EventListener::new(&self.window, "resize", move |_event| {
            let now = now_ms(&window);
            let decision = throttle.borrow_mut().on_event(now);
            match decision {
                ThrottleDecision::Emit => {
                    mailbox.post(HostSignal::Resize {
                        handle,
                        viewport: viewport_of(&window),
                    });
                }
                ThrottleDecision::Defer(delay_ms) => {
                    let window = window.clone();
                    let mailbox = Rc::clone(&mailbox);
                    let throttle = Rc::clone(&throttle);
                    let timeout = Timeout::new(delay_ms.ceil() as u32, move || {
                        if throttle.borrow_mut().on_timer(now_ms(&window)) {
                            mailbox.post(HostSignal::Resize {
                                handle,
                                viewport: viewport_of(&window),
                            });
                        }
                    });
                    *timer_slot.borrow_mut() = Some(timeout);
                }
                ThrottleDecision::Coalesced => {}
            }
        });

        Ok(Cleanup::new("resize", move || {
            drop(listener);
            // 取消尚未触发的尾随回调
            trailing.borrow_mut().take();
            Ok(())
        }))
    }

    fn request_frame(&mut self, handle: HandleId, token: FrameToken) -> Result<(), HostError> {
        let mailbox = Rc::clone(&self.mailbox);
        let frame = request_animation_frame(move |timestamp_ms| {
            mailbox.post(HostSignal::Frame {
                handle,
                token,
                timestamp_ms,
            });
        });
        self.frames.insert(handle, (token, frame));
        Ok(())
    }

    fn cancel_frame(&mut self, handle: HandleId) {
        self.frames.remove(&handle);
    }

    fn release(&mut self, handle: HandleId) {
        self.frames.remove(&handle);
        self.animations.cancel(handle);
    }

    fn take_signals(&mut self) -> Vec<HostSignal> {
        let signals = self.mailbox.take();
        for signal in &signals {
            if let HostSignal::Frame { handle, token, .. } = signal
                && self.frames.get(handle).is_some_and(|(pending, _)| pending == token)
            {
                // 已触发的帧只剩回调闭包，在这里释放
                trace!(%handle, "释放已触发的帧回调");
                self.frames.remove(handle);
            }
        }
        signals
    }
}

/// 读取视口尺寸
pub fn viewport_of(window: &Window) -> Viewport {
    let width = window
        .inner_width()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or_default();
    let height = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or_default();
    Viewport::new(width, height)
}

/// 单调时钟（毫秒）
fn now_ms(window: &Window) -> f64 {
    window
        .performance()
        .map(|performance| performance.now())
        .unwrap_or_else(js_sys::Date::now)
}

/// 把 JS 异常转换成可读文本
pub fn js_message(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|err| String::from(err.message()))
        })
        .unwrap_or_else(|| {
            warn!("无法读取 JS 异常内容");
            "unknown".to_string()
        })
}
