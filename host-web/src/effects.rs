//! # 浏览器效果
//!
//! 内置效果的 DOM / canvas 部分，计算交给 `fx_runtime::effects`。

use std::cell::RefCell;
use std::collections::HashMap;
use std::f64::consts::TAU;
use std::rc::Rc;

use fx_runtime::effects::{CountUp, ParticleConfig, ParticleField, StaggerPlan};
use fx_runtime::{Effect, EffectError, FrameContext, HandleId, StartContext, Viewport};
use gloo_render::{AnimationFrame, request_animation_frame};
use tracing::debug;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Element, HtmlCanvasElement, HtmlElement};

use crate::browser::js_message;

/// 依次出现的元素在可见时加上的 class
pub const REVEAL_CLASS: &str = "is-visible";

/// 粒子颜色
const PARTICLE_COLOR: &str = "rgba(148, 163, 184, 0.9)";
const LINK_COLOR: &str = "rgb(148, 163, 184)";
const PARTICLE_RADIUS: f64 = 1.6;

// ========== 粒子背景 ==========

/// 粒子连线背景
pub struct ParticleCanvas {
    canvas: HtmlCanvasElement,
    config: ParticleConfig,
}

/// 粒子背景的运行状态
pub struct ParticleState {
    field: ParticleField,
    context: CanvasRenderingContext2d,
}

impl ParticleCanvas {
    pub fn new(canvas: HtmlCanvasElement, config: ParticleConfig) -> Self {
        Self { canvas, config }
    }

    /// 按元素的显示尺寸设置画布像素尺寸
    fn fit_canvas(&self) -> Viewport {
        let width = self.canvas.client_width().max(0);
        let height = self.canvas.client_height().max(0);
        self.canvas.set_width(width as u32);
        self.canvas.set_height(height as u32);
        Viewport::new(f64::from(width), f64::from(height))
    }

    fn draw(&self, state: &ParticleState) -> Result<(), EffectError> {
        let ctx = &state.context;
        let viewport = state.field.viewport();
        ctx.clear_rect(0.0, 0.0, viewport.width, viewport.height);

        let particles = state.field.particles();
        ctx.set_stroke_style_str(LINK_COLOR);
        ctx.set_line_width(1.0);
        for link in state.field.links(self.config.link_distance) {
            let (a, b) = (particles[link.from], particles[link.to]);
            ctx.set_global_alpha(link.alpha * 0.6);
            ctx.begin_path();
            ctx.move_to(a.x, a.y);
            ctx.line_to(b.x, b.y);
            ctx.stroke();
        }

        ctx.set_global_alpha(1.0);
        ctx.set_fill_style_str(PARTICLE_COLOR);
        for p in particles {
            ctx.begin_path();
            ctx.arc(p.x, p.y, PARTICLE_RADIUS, 0.0, TAU)
                .map_err(|err| EffectError::new(js_message(&err)))?;
            ctx.fill();
        }
        Ok(())
    }
}

impl Effect for ParticleCanvas {
    type State = ParticleState;

    fn on_start(&mut self, ctx: &StartContext) -> Result<ParticleState, EffectError> {
        let context = self
            .canvas
            .get_context("2d")
            .map_err(|err| EffectError::new(js_message(&err)))?
            .ok_or_else(|| EffectError::new("canvas 不支持 2d 上下文"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| EffectError::new("2d 上下文类型不匹配"))?;

        let viewport = self.fit_canvas();
        let seed = (js_sys::Math::random() * f64::from(u32::MAX)) as u64;
        let field = ParticleField::new(&self.config, ctx.tier, viewport, seed);
        debug!(handle = %ctx.handle, tier = %ctx.tier, particles = field.len(), "粒子背景已启动");
        Ok(ParticleState { field, context })
    }

    fn on_frame(
        &mut self,
        state: &mut ParticleState,
        frame: &FrameContext,
    ) -> Result<(), EffectError> {
        state.field.step(frame.dt_secs);
        self.draw(state)
    }

    fn on_stop(&mut self, state: ParticleState) -> Result<(), EffectError> {
        let viewport = state.field.viewport();
        state
            .context
            .clear_rect(0.0, 0.0, viewport.width, viewport.height);
        Ok(())
    }

    fn on_resize(
        &mut self,
        state: &mut ParticleState,
        _viewport: Viewport,
    ) -> Result<(), EffectError> {
        // 画布尺寸跟随元素，而不是窗口
        let viewport = self.fit_canvas();
        state.field.resize(viewport);
        self.draw(state)
    }
}

// ========== 数字滚动 ==========

type FrameSlot = Rc<RefCell<Option<AnimationFrame>>>;

/// 一次性效果触发后自行运行的动画
///
/// 按句柄登记，句柄销毁时由宿主取消，未结束的帧循环不会比句柄活得久。
#[derive(Clone, Default)]
pub struct Animations {
    slots: Rc<RefCell<HashMap<HandleId, FrameSlot>>>,
}

impl Animations {
    /// 在元素上播放一次数字滚动
    ///
    /// 滚动有固定时长，使用自己的帧循环，结束后释放。
    pub fn play_count_up(&self, handle: HandleId, element: Element, counter: CountUp) {
        let slot = FrameSlot::default();
        self.slots.borrow_mut().insert(handle, Rc::clone(&slot));
        self.schedule_count_up(handle, slot, element, counter, None);
    }

    /// 取消句柄名下仍在运行的动画
    pub fn cancel(&self, handle: HandleId) {
        let slot = self.slots.borrow_mut().remove(&handle);
        if let Some(slot) = slot {
            // 丢弃挂起的帧即取消，同时打断 帧 → 闭包 → 槽 的引用环
            slot.borrow_mut().take();
            debug!(%handle, "已取消未结束的动画");
        }
    }

    fn schedule_count_up(
        &self,
        handle: HandleId,
        slot: FrameSlot,
        element: Element,
        counter: CountUp,
        started_at: Option<f64>,
    ) {
        let animations = self.clone();
        let next = Rc::clone(&slot);
        let frame = request_animation_frame(move |timestamp| {
            let started_at = started_at.unwrap_or(timestamp);
            let elapsed = timestamp - started_at;
            element.set_text_content(Some(&counter.format(counter.value_at(elapsed))));
            if counter.is_done(elapsed) {
                animations.slots.borrow_mut().remove(&handle);
                next.borrow_mut().take();
            } else {
                animations.schedule_count_up(handle, next, element, counter, Some(started_at));
            }
        });
        *slot.borrow_mut() = Some(frame);
    }
}

/// 直接显示最终数字（减少动态效果时）
pub fn show_final_count(element: &Element, counter: &CountUp) {
    element.set_text_content(Some(&counter.final_text()));
}

// ========== 依次出现 ==========

/// 给分组内的元素按顺序设置延迟并加上可见 class
///
/// 分组内有 `[data-reveal-item]` 时只处理这些元素，否则处理直接子元素。
pub fn reveal_group(group: &Element, plan: StaggerPlan, animate: bool) -> Result<usize, JsValue> {
    let items = reveal_items(group)?;
    for (index, item) in items.iter().enumerate() {
        if let Some(html) = item.dyn_ref::<HtmlElement>() {
            let delay = if animate { plan.delay_for(index) } else { 0.0 };
            html.style()
                .set_property("transition-delay", &format!("{delay}ms"))?;
        }
        item.class_list().add_1(REVEAL_CLASS)?;
    }
    group.class_list().add_1(REVEAL_CLASS)?;
    Ok(items.len())
}

fn reveal_items(group: &Element) -> Result<Vec<Element>, JsValue> {
    let marked = group.query_selector_all("[data-reveal-item]")?;
    if marked.length() > 0 {
        return Ok((0..marked.length())
            .filter_map(|i| marked.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect());
    }
    let children = group.children();
    Ok((0..children.length())
        .filter_map(|i| children.item(i))
        .collect())
}
