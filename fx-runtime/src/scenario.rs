//! # Scenario 模块
//!
//! 用 JSON 描述的生命周期场景，在 [`HeadlessHost`] 上回放并核对期望。
//!
//! ```json
//! {
//!   "name": "frame-fault",
//!   "effects": [{ "name": "hero", "target": "hero", "fail_on_frame": 5 }],
//!   "steps": [
//!     { "action": "show", "target": "hero", "ratio": 1.0 },
//!     { "action": "frames", "count": 10 }
//!   ],
//!   "expect": [{ "effect": "hero", "state": "paused", "frames": 5, "faults": 1 }]
//! }
//! ```
//!
//! 场景中的每个效果都是记录型效果：只统计回调次数，可按配置在指定回调上失败。

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::capability::{CapabilityTier, DeviceHints};
use crate::clock::FrameContext;
use crate::config::FxConfig;
use crate::controller::{EffectController, EffectState, HandleId, HandleKind};
use crate::effect::{Effect, FireContext, StartContext, Viewport};
use crate::error::{EffectError, ScenarioError};
use crate::host::HeadlessHost;
use crate::options::EffectOptions;

// ========== 场景描述 ==========

/// 生命周期场景
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub environment: Environment,
    pub effects: Vec<EffectSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub expect: Vec<Expectation>,
}

/// 模拟的宿主环境
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub reduced_motion: bool,
    #[serde(default)]
    pub logical_cores: Option<u32>,
    #[serde(default)]
    pub memory_gb: Option<f64>,
    #[serde(default = "default_true")]
    pub observers_supported: bool,
    /// 执行时会失败的清理动作名称（`observer` / `resize`）
    #[serde(default)]
    pub failing_cleanups: Vec<String>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            reduced_motion: false,
            logical_cores: None,
            memory_gb: None,
            observers_supported: true,
            failing_cleanups: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_frame_interval() -> f64 {
    1000.0 / 60.0
}

/// 场景中的一个效果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSpec {
    /// 场景内唯一名称
    pub name: String,
    /// 目标名称，缺省表示没有目标
    #[serde(default)]
    pub target: Option<String>,
    /// 目标存在但未挂载到文档
    #[serde(default)]
    pub detached: bool,
    #[serde(default = "default_kind")]
    pub kind: HandleKind,
    /// 缺省时使用配置中的默认选项
    #[serde(default)]
    pub options: Option<EffectOptions>,
    #[serde(default)]
    pub fail_on_start: bool,
    /// 第 N 次 `on_frame`（从 1 开始）返回错误
    #[serde(default)]
    pub fail_on_frame: Option<u64>,
    #[serde(default)]
    pub fail_on_stop: bool,
    #[serde(default)]
    pub fail_on_fire: bool,
}

fn default_kind() -> HandleKind {
    HandleKind::Continuous
}

/// 场景步骤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// 目标以给定比例进入视口
    Show { target: String, ratio: f64 },
    /// 目标离开视口
    Hide { target: String },
    /// 推进若干个显示刷新
    Frames {
        count: u32,
        #[serde(default = "default_frame_interval")]
        interval_ms: f64,
    },
    /// 视口尺寸变化
    Resize { width: f64, height: f64 },
    /// 销毁某个效果
    Destroy { effect: String },
    /// 销毁全部效果
    DestroyAll,
    /// 页面卸载
    Unload,
}

/// 对某个效果的期望（只核对写出的字段）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Expectation {
    pub effect: String,
    #[serde(default)]
    pub state: Option<EffectState>,
    #[serde(default)]
    pub starts: Option<u64>,
    #[serde(default)]
    pub frames: Option<u64>,
    #[serde(default)]
    pub stops: Option<u64>,
    #[serde(default)]
    pub resizes: Option<u64>,
    #[serde(default)]
    pub fires: Option<u64>,
    #[serde(default)]
    pub faults: Option<usize>,
    #[serde(default)]
    pub tier: Option<CapabilityTier>,
}

impl Scenario {
    /// 从 JSON 字符串解析
    pub fn from_json_str(text: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = serde_json::from_str(text)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// 从文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut scenario = Self::from_json_str(&text)?;
        if scenario.name.is_empty() {
            scenario.name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        Ok(scenario)
    }

    /// 检查效果名称唯一、步骤与期望引用的效果都已声明
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let mut names = Vec::with_capacity(self.effects.len());
        for spec in &self.effects {
            if names.contains(&spec.name.as_str()) {
                return Err(ScenarioError::DuplicateEffect(spec.name.clone()));
            }
            names.push(spec.name.as_str());
        }

        let referenced = self
            .steps
            .iter()
            .filter_map(|step| match step {
                Step::Destroy { effect } => Some(effect),
                _ => None,
            })
            .chain(self.expect.iter().map(|e| &e.effect));
        for name in referenced {
            if !names.contains(&name.as_str()) {
                return Err(ScenarioError::UnknownEffect(name.clone()));
            }
        }
        Ok(())
    }
}

// ========== 记录型效果 ==========

/// 效果回调的调用统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EffectCalls {
    pub starts: u64,
    pub frames: u64,
    pub stops: u64,
    pub resizes: u64,
    pub fires: u64,
    /// `on_start` 收到的档位
    pub tier: Option<CapabilityTier>,
}

/// 只记录调用的效果
struct RecordingEffect {
    calls: Rc<RefCell<EffectCalls>>,
    fail_on_start: bool,
    fail_on_frame: Option<u64>,
    fail_on_stop: bool,
}

impl Effect for RecordingEffect {
    type State = ();

    fn on_start(&mut self, ctx: &StartContext) -> Result<(), EffectError> {
        let mut calls = self.calls.borrow_mut();
        calls.starts += 1;
        calls.tier = Some(ctx.tier);
        if self.fail_on_start {
            return Err(EffectError::new("on_start 按场景设定失败"));
        }
        Ok(())
    }

    fn on_frame(&mut self, _state: &mut (), _frame: &FrameContext) -> Result<(), EffectError> {
        let mut calls = self.calls.borrow_mut();
        calls.frames += 1;
        if self.fail_on_frame == Some(calls.frames) {
            return Err(EffectError::new(format!(
                "第 {} 帧按场景设定失败",
                calls.frames
            )));
        }
        Ok(())
    }

    fn on_stop(&mut self, _state: ()) -> Result<(), EffectError> {
        self.calls.borrow_mut().stops += 1;
        if self.fail_on_stop {
            return Err(EffectError::new("on_stop 按场景设定失败"));
        }
        Ok(())
    }

    fn on_resize(&mut self, _state: &mut (), _viewport: Viewport) -> Result<(), EffectError> {
        self.calls.borrow_mut().resizes += 1;
        Ok(())
    }
}

// ========== 报告 ==========

/// 单个效果的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectReport {
    pub handle: HandleId,
    pub state: EffectState,
    pub calls: EffectCalls,
    pub faults: usize,
}

/// 场景执行报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub tier: CapabilityTier,
    /// 事件轨迹（按发生顺序）
    pub trace: Vec<String>,
    /// 按名称排列的效果结果（状态取自场景结束、控制器释放之前）
    pub effects: BTreeMap<String, EffectReport>,
    /// 在已有挂起请求时重复请求帧的次数
    pub duplicate_frame_requests: u64,
    /// 未满足的期望
    pub failures: Vec<String>,
}

impl ScenarioReport {
    /// 是否满足全部期望
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

// ========== 执行 ==========

/// 执行场景
pub fn run_scenario(scenario: &Scenario, config: &FxConfig) -> ScenarioReport {
    info!(name = %scenario.name, steps = scenario.steps.len(), "执行场景");

    let env = &scenario.environment;
    let host = HeadlessHost::new()
        .with_reduced_motion(env.reduced_motion)
        .with_hints(DeviceHints::new(env.logical_cores, env.memory_gb));
    let host = if env.observers_supported {
        host
    } else {
        host.without_observers()
    };
    for label in &env.failing_cleanups {
        host.fail_cleanup(label);
    }

    let mut controller = EffectController::new(host.clone(), config.clone());
    let mut handles: BTreeMap<String, (HandleId, Rc<RefCell<EffectCalls>>)> = BTreeMap::new();

    for spec in &scenario.effects {
        let calls = Rc::new(RefCell::new(EffectCalls::default()));
        let options = spec.options.unwrap_or(controller.default_options());
        if let Some(target) = &spec.target
            && spec.detached
        {
            host.detach(target);
        }

        let id = match spec.kind {
            HandleKind::Continuous => {
                let effect = RecordingEffect {
                    calls: Rc::clone(&calls),
                    fail_on_start: spec.fail_on_start,
                    fail_on_frame: spec.fail_on_frame,
                    fail_on_stop: spec.fail_on_stop,
                };
                controller.create(spec.target.clone(), effect, options)
            }
            HandleKind::OneShot => {
                let fired = Rc::clone(&calls);
                let fail = spec.fail_on_fire;
                controller.create_one_shot(
                    spec.target.clone(),
                    move |_ctx: &FireContext| {
                        fired.borrow_mut().fires += 1;
                        if fail {
                            return Err(EffectError::new("fire 按场景设定失败"));
                        }
                        Ok(())
                    },
                    options,
                )
            }
        };
        debug!(effect = %spec.name, handle = %id, "场景效果已创建");
        handles.insert(spec.name.clone(), (id, calls));
    }
    let mut events = controller.drain_events();

    let mut now_ms = 0.0_f64;
    for step in &scenario.steps {
        match step {
            Step::Show { target, ratio } => host.show(target, *ratio),
            Step::Hide { target } => host.hide(target),
            Step::Frames { count, interval_ms } => {
                for _ in 0..*count {
                    // 先应用之前排队的信号，再刷新
                    controller.pump();
                    now_ms += *interval_ms;
                    host.advance_frame(now_ms);
                    controller.pump();
                }
            }
            Step::Resize { width, height } => host.resize(Viewport::new(*width, *height)),
            Step::Destroy { effect } => {
                if let Some((id, _)) = handles.get(effect) {
                    controller.destroy(*id);
                }
            }
            Step::DestroyAll => controller.destroy_all(),
            Step::Unload => host.unload(),
        }
        controller.pump();
        events.extend(controller.drain_events());
    }

    let trace = events.iter().map(ToString::to_string).collect();

    let effects: BTreeMap<String, EffectReport> = handles
        .iter()
        .map(|(name, (id, calls))| {
            let faults = events
                .iter()
                .filter(|event| event.is_fault() && event.handle() == Some(*id))
                .count();
            let report = EffectReport {
                handle: *id,
                state: controller.state(*id).unwrap_or(EffectState::Destroyed),
                calls: *calls.borrow(),
                faults,
            };
            (name.clone(), report)
        })
        .collect();

    let mut report = ScenarioReport {
        name: scenario.name.clone(),
        tier: controller.tier(),
        trace,
        effects,
        duplicate_frame_requests: host.duplicate_frame_requests(),
        failures: Vec::new(),
    };
    report.failures = check_expectations(&scenario.expect, &report);
    report
}

/// 核对期望，返回未满足的条目
fn check_expectations(expect: &[Expectation], report: &ScenarioReport) -> Vec<String> {
    let mut failures = Vec::new();
    if report.duplicate_frame_requests > 0 {
        failures.push(format!(
            "重复请求帧 {} 次",
            report.duplicate_frame_requests
        ));
    }

    for e in expect {
        let Some(actual) = report.effects.get(&e.effect) else {
            failures.push(format!("{}: 未声明的效果", e.effect));
            continue;
        };
        let mut check = |field: &str, expected: Option<String>, got: String| {
            if let Some(expected) = expected
                && expected != got
            {
                failures.push(format!(
                    "{}: {field} 期望 {expected}，实际 {got}",
                    e.effect
                ));
            }
        };
        check(
            "state",
            e.state.map(|s| s.to_string()),
            actual.state.to_string(),
        );
        check(
            "starts",
            e.starts.map(|n| n.to_string()),
            actual.calls.starts.to_string(),
        );
        check(
            "frames",
            e.frames.map(|n| n.to_string()),
            actual.calls.frames.to_string(),
        );
        check(
            "stops",
            e.stops.map(|n| n.to_string()),
            actual.calls.stops.to_string(),
        );
        check(
            "resizes",
            e.resizes.map(|n| n.to_string()),
            actual.calls.resizes.to_string(),
        );
        check(
            "fires",
            e.fires.map(|n| n.to_string()),
            actual.calls.fires.to_string(),
        );
        check(
            "faults",
            e.faults.map(|n| n.to_string()),
            actual.faults.to_string(),
        );
        check(
            "tier",
            e.tier.map(|t| t.to_string()),
            actual
                .calls
                .tier
                .map(|t| t.to_string())
                .unwrap_or_else(|| "-".to_string()),
        );
    }
    failures
}
