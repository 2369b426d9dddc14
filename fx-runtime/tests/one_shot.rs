//! # 一次性效果集成测试
//!
//! 数字滚动、依次出现这类"进入视口触发一次"的效果。

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fx_runtime::{
    ControllerEvent, EffectController, EffectError, EffectOptions, EffectState, FireContext,
    FxConfig, FxError, HeadlessHost,
};

fn counter_target() -> Option<String> {
    Some("stats".to_string())
}

#[test]
fn test_fires_exactly_once() {
    let host = HeadlessHost::new();
    let mut controller = EffectController::new(host.clone(), FxConfig::default());
    let fired = Rc::new(Cell::new(0));
    let counter = Rc::clone(&fired);

    let id = controller.create_one_shot(
        counter_target(),
        move |_ctx: &FireContext| {
            counter.set(counter.get() + 1);
            Ok(())
        },
        EffectOptions::default(),
    );

    for _ in 0..3 {
        host.show("stats", 1.0);
        host.hide("stats");
        controller.pump();
    }
    // 即使信号被直接投递也不会再次触发
    controller.handle_signal(fx_runtime::HostSignal::Visibility {
        handle: id,
        signal: fx_runtime::VisibilitySignal::visible(1.0),
    });

    assert_eq!(fired.get(), 1);
    assert_eq!(controller.state(id), Some(EffectState::Fired));
    assert!(!controller.is_running(id));
}

#[test]
fn test_fire_disconnects_observer() {
    let host = HeadlessHost::new();
    let mut controller = EffectController::new(host.clone(), FxConfig::default());
    let id = controller.create_one_shot(
        counter_target(),
        |_ctx: &FireContext| Ok(()),
        EffectOptions::default(),
    );
    assert_eq!(host.observer_count(), 1);

    host.show("stats", 1.0);
    controller.pump();

    assert_eq!(host.observer_count(), 0);
    assert_eq!(host.cleanup_log(), vec![(id, "observer".to_string())]);
    assert_eq!(controller.handle(id).unwrap().pending_cleanups, 0);
    assert_eq!(host.frame_requests(), 0);

    // 销毁已触发的句柄不会重复执行清理
    controller.destroy(id);
    assert_eq!(host.cleanup_log().len(), 1);
}

#[test]
fn test_fire_receives_ratio_above_threshold() {
    let host = HeadlessHost::new();
    let mut controller = EffectController::new(host.clone(), FxConfig::default());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let record = Rc::clone(&seen);

    let id = controller.create_one_shot(
        counter_target(),
        move |ctx: &FireContext| {
            record.borrow_mut().push((ctx.handle, ctx.ratio));
            Ok(())
        },
        EffectOptions::default().with_threshold(0.5),
    );

    host.show("stats", 0.25);
    controller.pump();
    assert!(seen.borrow().is_empty());

    host.show("stats", 0.75);
    controller.pump();
    assert_eq!(*seen.borrow(), vec![(id, 0.75)]);
}

#[test]
fn test_fire_failure_still_terminates() {
    let host = HeadlessHost::new();
    let mut controller = EffectController::new(host.clone(), FxConfig::default());
    let id = controller.create_one_shot(
        counter_target(),
        |_ctx: &FireContext| Err(EffectError::new("数字格式无效")),
        EffectOptions::default(),
    );
    controller.drain_events();

    host.show("stats", 1.0);
    controller.pump();

    assert_eq!(controller.state(id), Some(EffectState::Fired));
    assert_eq!(host.observer_count(), 0);
    let events = controller.drain_events();
    assert!(matches!(
        events.as_slice(),
        [
            ControllerEvent::Faulted(FxError::EffectFault { .. }),
            ControllerEvent::Fired(_),
        ]
    ));
}

#[test]
fn test_reduced_motion_disables_one_shot() {
    let host = HeadlessHost::new().with_reduced_motion(true);
    let mut controller = EffectController::new(host.clone(), FxConfig::default());
    let fired = Rc::new(Cell::new(false));
    let flag = Rc::clone(&fired);

    let id = controller.create_one_shot(
        counter_target(),
        move |_ctx: &FireContext| {
            flag.set(true);
            Ok(())
        },
        EffectOptions::default(),
    );
    host.show("stats", 1.0);
    controller.pump();

    assert_eq!(controller.state(id), Some(EffectState::Disabled));
    assert!(!fired.get());
}

#[test]
fn test_destroy_before_fire() {
    let host = HeadlessHost::new();
    let mut controller = EffectController::new(host.clone(), FxConfig::default());
    let fired = Rc::new(Cell::new(false));
    let flag = Rc::clone(&fired);

    let id = controller.create_one_shot(
        counter_target(),
        move |_ctx: &FireContext| {
            flag.set(true);
            Ok(())
        },
        EffectOptions::default(),
    );
    host.show("stats", 1.0);
    controller.destroy(id);
    controller.pump();

    assert!(!fired.get());
    assert_eq!(controller.state(id), Some(EffectState::Destroyed));
}

#[test]
fn test_destroy_after_fire_releases_host_resources() {
    let host = HeadlessHost::new();
    let mut controller = EffectController::new(host.clone(), FxConfig::default());
    let id = controller.create_one_shot(
        counter_target(),
        |_ctx: &FireContext| Ok(()),
        EffectOptions::default(),
    );

    host.show("stats", 1.0);
    controller.pump();
    assert_eq!(controller.state(id), Some(EffectState::Fired));
    // 触发后宿主可能仍在播放滚动动画，直到销毁才释放
    assert!(host.released().is_empty());

    controller.destroy(id);
    controller.destroy(id);

    assert_eq!(host.released(), vec![id]);
    assert_eq!(host.cleanup_log(), vec![(id, "observer".to_string())]);
}

#[test]
fn test_unload_releases_every_handle_in_order() {
    let host = HeadlessHost::new();
    let mut controller = EffectController::new(host.clone(), FxConfig::default());
    let fired = controller.create_one_shot(
        counter_target(),
        |_ctx: &FireContext| Ok(()),
        EffectOptions::default(),
    );
    let disabled =
        controller.create_one_shot(None, |_ctx: &FireContext| Ok(()), EffectOptions::default());
    let waiting = controller.create_one_shot(
        Some("footer".to_string()),
        |_ctx: &FireContext| Ok(()),
        EffectOptions::default(),
    );

    host.show("stats", 1.0);
    controller.pump();
    host.unload();
    controller.pump();

    assert_eq!(host.released(), vec![fired, disabled, waiting]);
    assert_eq!(controller.live_count(), 0);
}
