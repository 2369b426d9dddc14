//! # Boot 模块
//!
//! wasm 入口：读取配置，扫描 `[data-fx]` 元素并交给控制器。

use std::cell::RefCell;
use std::rc::Rc;

use fx_runtime::{
    EffectController, EffectError, EffectState, FireContext, FxConfig, HandleId, HostSignal,
};
use gloo_events::EventListener;
use tracing::{info, warn};
use tracing_wasm::WASMLayerConfigBuilder;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlCanvasElement};

use crate::attrs::{FxKind, count_up_from_attrs, options_from_attrs, stagger_from_attrs};
use crate::browser::{BrowserController, BrowserHost, Mailbox, js_message};
use crate::effects::{ParticleCanvas, reveal_group, show_final_count};

/// 页面内联配置的元素 ID
const CONFIG_ELEMENT_ID: &str = "fx-config";

/// 页面存活期间持有的运行时
struct Runtime {
    controller: Rc<RefCell<BrowserController>>,
    _unload: EventListener,
}

thread_local! {
    static RUNTIME: RefCell<Option<Runtime>> = const { RefCell::new(None) };
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default_with_config(
        WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::INFO)
            .build(),
    );

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("window 不可用"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("document 不可用"))?;
    let config = read_config(&document);

    let mailbox = Rc::new(Mailbox::default());
    let host = BrowserHost::new(window.clone(), Rc::clone(&mailbox));
    let controller = Rc::new(RefCell::new(EffectController::new(host, config)));
    mailbox.attach(&controller);

    let created = boot_effects(&document, &mut controller.borrow_mut())?;
    info!(count = created, "效果已挂载");

    let unload_mailbox = Rc::clone(&mailbox);
    let unload = EventListener::new(&window, "pagehide", move |_event| {
        unload_mailbox.post(HostSignal::Unload);
    });

    RUNTIME.with(|slot| {
        *slot.borrow_mut() = Some(Runtime {
            controller,
            _unload: unload,
        });
    });
    Ok(())
}

/// 销毁全部效果并释放运行时（单页应用切换页面时调用）
#[wasm_bindgen(js_name = destroyAll)]
pub fn destroy_all() {
    let runtime = RUNTIME.with(|slot| slot.borrow_mut().take());
    if let Some(runtime) = runtime {
        runtime.controller.borrow_mut().destroy_all();
    }
}

/// 读取页面内联配置，缺失或无效时使用默认值
fn read_config(document: &Document) -> FxConfig {
    let Some(text) = document
        .get_element_by_id(CONFIG_ELEMENT_ID)
        .and_then(|element| element.text_content())
    else {
        return FxConfig::default();
    };
    match FxConfig::from_json_str(&text) {
        Ok(config) => config,
        Err(err) => {
            warn!("{err}，使用默认配置");
            FxConfig::default()
        }
    }
}

/// 为页面上所有 `[data-fx]` 元素创建句柄
fn boot_effects(document: &Document, controller: &mut BrowserController) -> Result<usize, JsValue> {
    let nodes = document.query_selector_all("[data-fx]")?;
    let mut created = 0;
    for i in 0..nodes.length() {
        let Some(element) = nodes.item(i).and_then(|node| node.dyn_into::<Element>().ok()) else {
            continue;
        };
        let raw = element.get_attribute("data-fx").unwrap_or_default();
        let Some(kind) = FxKind::parse(&raw) else {
            warn!(value = %raw, "未知的 data-fx 值");
            continue;
        };
        if boot_one(controller, kind, element).is_some() {
            created += 1;
        }
    }
    Ok(created)
}

fn boot_one(controller: &mut BrowserController, kind: FxKind, element: Element) -> Option<HandleId> {
    let attr = |name: &str| element.get_attribute(name);
    let options = options_from_attrs(kind, controller.default_options(), attr);

    let id = match kind {
        FxKind::Particles => {
            let Ok(canvas) = element.clone().dyn_into::<HtmlCanvasElement>() else {
                warn!("data-fx=\"particles\" 只能用于 <canvas>");
                return None;
            };
            let effect = ParticleCanvas::new(canvas, controller.config().particles.clone());
            controller.create(Some(element), effect, options)
        }
        FxKind::Counter => {
            let counter = count_up_from_attrs(attr)?;
            let target = element.clone();
            let final_counter = counter.clone();
            let animations = controller.host().animations();
            let id = controller.create_one_shot(
                Some(element.clone()),
                move |ctx: &FireContext| {
                    animations.play_count_up(ctx.handle, target, counter);
                    Ok(())
                },
                options,
            );
            if controller.state(id) == Some(EffectState::Disabled) {
                show_final_count(&element, &final_counter);
            }
            id
        }
        FxKind::Reveal => {
            let plan = stagger_from_attrs(attr);
            let target = element.clone();
            let id = controller.create_one_shot(
                Some(element.clone()),
                move |_ctx: &FireContext| {
                    reveal_group(&target, plan, true)
                        .map(|_| ())
                        .map_err(|err| EffectError::new(js_message(&err)))
                },
                options,
            );
            if controller.state(id) == Some(EffectState::Disabled)
                && let Err(err) = reveal_group(&element, plan, false)
            {
                warn!("{}", js_message(&err));
            }
            id
        }
    };
    info!(handle = %id, kind = kind.as_str(), "效果已创建");
    Some(id)
}
