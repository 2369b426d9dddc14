//! # 场景回放测试
//!
//! 回放仓库根目录 `scenarios/` 下的场景文件，并核对其中的期望。

use std::path::PathBuf;

use fx_runtime::{CapabilityTier, EffectState, FxConfig, Scenario, run_scenario};

fn scenario_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("scenarios")
        .join(name)
}

fn replay(name: &str) -> fx_runtime::ScenarioReport {
    let scenario = Scenario::load(scenario_path(name)).unwrap();
    let report = run_scenario(&scenario, &FxConfig::default());
    assert!(report.passed(), "{name}: {:#?}", report.failures);
    report
}

#[test]
fn test_missing_target() {
    let report = replay("a-missing-target.json");
    assert!(report.trace.iter().all(|line| line.contains("disabled")));
}

#[test]
fn test_threshold_activation() {
    replay("b-threshold.json");
}

#[test]
fn test_scroll_reentry_starts_once() {
    let report = replay("c-reentry.json");
    let started = report
        .trace
        .iter()
        .filter(|line| line.ends_with("started"))
        .count();
    let resumed = report
        .trace
        .iter()
        .filter(|line| line.ends_with("resumed"))
        .count();
    assert_eq!(started, 1);
    assert_eq!(resumed, 3);
}

#[test]
fn test_frame_fault_logged_once() {
    let report = replay("d-frame-fault.json");
    let hero = &report.effects["hero"];
    assert_eq!(hero.state, EffectState::Paused);
    assert_eq!(hero.calls.frames, 5);
    assert_eq!(
        report
            .trace
            .iter()
            .filter(|line| line.contains("on_frame"))
            .count(),
        1
    );
}

#[test]
fn test_low_tier_device() {
    let report = replay("e-low-tier.json");
    assert_eq!(report.tier, CapabilityTier::Low);
}

#[test]
fn test_reduced_motion() {
    replay("reduced-motion.json");
}

#[test]
fn test_teardown() {
    let report = replay("teardown.json");
    assert_eq!(report.duplicate_frame_requests, 0);
    assert_eq!(
        report
            .trace
            .iter()
            .filter(|line| line.ends_with("destroyed"))
            .count(),
        3
    );
}

#[test]
fn test_all_scenarios_pass() {
    let dir = scenario_path("");
    let mut checked = 0;
    for entry in std::fs::read_dir(&dir).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().is_some_and(|ext| ext == "json") {
            let scenario = Scenario::load(&path).unwrap();
            let report = run_scenario(&scenario, &FxConfig::default());
            assert!(report.passed(), "{}: {:#?}", path.display(), report.failures);
            checked += 1;
        }
    }
    assert!(checked >= 7);
}
