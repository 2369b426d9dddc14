//! # FX Runtime
//!
//! 可见性门控的动画调度核心库。
//!
//! ## 架构概述
//!
//! `fx-runtime` 是纯逻辑核心，不依赖 DOM。它通过 [`Host`] 接口与宿主层通信：
//!
//! ```text
//! Host                              EffectController
//!   │                                     │
//!   │──── HostSignal (可见性 / 帧 / ...) ─►│ pump()
//!   │                                     │
//!   │◄─── observe / request_frame / ... ──│
//!   │                                     │
//! ```
//!
//! 效果只在目标可见、用户允许动态效果、句柄未禁用或销毁时逐帧运行。
//! 离开视口即暂停（保留状态），销毁时按注册顺序释放所有监听器。
//!
//! ## 核心类型
//!
//! - [`EffectController`]：句柄表与状态机
//! - [`Effect`] / [`OneShot`]：持续效果与一次性效果
//! - [`Host`]：宿主环境接口；[`HeadlessHost`] 为纯内存实现
//! - [`FxConfig`]：运行时配置
//!
//! ## 使用示例
//!
//! ```ignore
//! use fx_runtime::{EffectController, EffectOptions, FxConfig, HeadlessHost};
//!
//! let host = HeadlessHost::new();
//! let mut controller = EffectController::new(host.clone(), FxConfig::default());
//! let id = controller.create(Some("hero".to_string()), effect, EffectOptions::default());
//!
//! host.show("hero", 1.0);
//! controller.pump();
//! assert!(controller.is_running(id));
//! ```
//!
//! ## 模块结构
//!
//! - [`controller`]：控制器与句柄
//! - [`effect`]：效果能力集
//! - [`host`]：宿主边界
//! - [`clock`] / [`throttle`]：帧时钟与 resize 节流
//! - [`capability`]：设备档位
//! - [`effects`]：内置效果的纯计算部分
//! - [`scenario`]：场景回放

pub mod capability;
pub mod clock;
pub mod config;
pub mod controller;
pub mod effect;
pub mod effects;
pub mod error;
pub mod event;
pub mod host;
pub mod options;
pub mod scenario;
pub mod throttle;

// 重导出核心类型
pub use capability::{CapabilityThresholds, CapabilityTier, DeviceHints};
pub use clock::{FrameClock, FrameContext};
pub use config::FxConfig;
pub use controller::{
    DisableReason, EffectController, EffectState, HandleId, HandleInfo, HandleKind,
};
pub use effect::{Effect, FireContext, OneShot, StartContext, Viewport};
pub use error::{
    ConfigError, EffectError, EffectPhase, FxError, HostError, ScenarioError,
};
pub use event::ControllerEvent;
pub use host::{Cleanup, FrameToken, HeadlessHost, Host, HostSignal, VisibilitySignal};
pub use options::EffectOptions;
pub use scenario::{Scenario, ScenarioReport, run_scenario};
pub use throttle::{ResizeThrottle, ThrottleDecision};
