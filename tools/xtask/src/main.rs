//! # xtask - 开发辅助工具
//!
//! 提供本地质量门禁与开发辅助命令。
//!
//! ## 命令
//!
//! - `check-all`: 运行 fmt、clippy、test，并检查 host-web 能否编译到 wasm32
//! - `cov-runtime`: 运行 fx-runtime 覆盖率
//! - `cov-workspace`: 运行 workspace 覆盖率
//! - `scenario-check`: 回放场景文件并核对期望

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use fx_runtime::{FxConfig, Scenario, ScenarioReport, run_scenario};
use walkdir::WalkDir;
use xshell::{Shell, cmd};

const WASM_TARGET: &str = "wasm32-unknown-unknown";

fn step(name: &str) {
    eprintln!("\n==> {name}");
}

fn ensure_cargo_llvm_cov_available(sh: &Shell) -> anyhow::Result<()> {
    if cmd!(sh, "cargo llvm-cov --version").quiet().run().is_err() {
        anyhow::bail!(
            "cargo llvm-cov 不可用。\n\
请先安装：\n\
  - cargo install cargo-llvm-cov\n\
  - rustup component add llvm-tools-preview\n\
然后重试。"
        );
    }
    Ok(())
}

fn wasm_target_installed(sh: &Shell) -> bool {
    cmd!(sh, "rustup target list --installed")
        .quiet()
        .read()
        .is_ok_and(|targets| targets.lines().any(|line| line.trim() == WASM_TARGET))
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("xtask error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let sub = args.next().unwrap_or_else(|| "help".to_string());
    let sh = Shell::new()?;

    match sub.as_str() {
        "check-all" => {
            step("cargo fmt --all -- --check");
            cmd!(sh, "cargo fmt --all -- --check").run()?;

            step("cargo clippy --workspace --all-targets");
            cmd!(sh, "cargo clippy --workspace --all-targets").run()?;

            step("cargo test --workspace");
            cmd!(sh, "cargo test --workspace").run()?;

            // host-web 的浏览器部分只在 wasm32 上编译
            if wasm_target_installed(&sh) {
                step("cargo check -p host-web --target wasm32-unknown-unknown");
                cmd!(sh, "cargo check -p host-web --target {WASM_TARGET}").run()?;
            } else {
                eprintln!("\n[WARN] 未安装 {WASM_TARGET}，跳过 host-web 的 wasm 检查");
            }
        }
        "cov-runtime" => {
            ensure_cargo_llvm_cov_available(&sh)?;

            step("cargo llvm-cov -p fx-runtime --all-features --html");
            cmd!(sh, "cargo llvm-cov -p fx-runtime --all-features --html").run()?;

            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        "cov-workspace" => {
            ensure_cargo_llvm_cov_available(&sh)?;

            // 排除 xtask，避免稀释信号
            step("cargo llvm-cov --workspace --exclude xtask --all-features --html");
            cmd!(
                sh,
                "cargo llvm-cov --workspace --exclude xtask --all-features --html"
            )
            .run()?;

            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        "scenario-check" => {
            let path = args.next();
            scenario_check(path.as_deref())?;
        }
        "help" | "-h" | "--help" => {
            print_help();
        }
        other => anyhow::bail!("unknown xtask subcommand: {other}"),
    }

    Ok(())
}

fn print_help() {
    eprintln!(
        r#"xtask - 开发辅助工具

USAGE:
  cargo xtask <command>

COMMANDS:
  check-all       运行 fmt、clippy、test 门禁检查（已安装 wasm32 目标时追加 host-web 检查）
  cov-runtime     运行 fx-runtime 覆盖率报告
  cov-workspace   运行 workspace 覆盖率报告
  scenario-check  回放场景文件

SCENARIO-CHECK:
  cargo xtask scenario-check [path]

  不带参数：回放 scenarios/ 下所有 .json 文件
  带路径参数：回放指定文件或目录

  检查内容：
    - 场景文件格式
    - 效果名称重复或未定义
    - 期望的状态与回调次数
    - 同一句柄在已有挂起帧时再次请求帧

ALIASES (in .cargo/config.toml):
  cargo check-all      -> cargo xtask check-all
  cargo cov-runtime    -> cargo xtask cov-runtime
  cargo cov-workspace  -> cargo xtask cov-workspace
  cargo scenario-check -> cargo xtask scenario-check
"#
    );
}

//=============================================================================
// scenario-check 命令实现
//=============================================================================

/// 默认场景目录（相对于 workspace root）
const SCENARIOS_DIR: &str = "scenarios";

/// 场景检查结果
#[derive(Default)]
struct ScenarioCheckResult {
    /// 回放的场景数量
    scenarios_checked: usize,
    /// 无法加载的场景
    load_errors: usize,
    /// 未通过的场景报告
    failed: Vec<ScenarioReport>,
}

/// 执行场景检查
fn scenario_check(path: Option<&str>) -> anyhow::Result<()> {
    let files = match path {
        Some(p) => {
            let path = PathBuf::from(p);
            if path.is_file() {
                vec![path]
            } else if path.is_dir() {
                collect_scenario_files(&path)?
            } else {
                anyhow::bail!("路径不存在: {}", p);
            }
        }
        None => {
            let dir = Path::new(SCENARIOS_DIR);
            if !dir.exists() {
                anyhow::bail!(
                    "默认场景目录不存在: {}\n请在 workspace 根目录运行，或指定场景路径",
                    dir.display()
                );
            }
            collect_scenario_files(dir)?
        }
    };

    if files.is_empty() {
        eprintln!("未找到场景文件（.json）");
        return Ok(());
    }

    eprintln!("==> 回放 {} 个场景文件...\n", files.len());

    let config = FxConfig::default();
    let mut result = ScenarioCheckResult::default();
    for file in &files {
        check_scenario_file(file, &config, &mut result);
    }

    print_check_result(&result);

    if result.load_errors > 0 || !result.failed.is_empty() {
        anyhow::bail!("场景检查发现错误");
    }
    Ok(())
}

/// 收集目录下的所有场景文件
fn collect_scenario_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if entry.file_type().is_file() && entry.path().extension().is_some_and(|ext| ext == "json")
        {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// 回放单个场景文件
fn check_scenario_file(file: &Path, config: &FxConfig, result: &mut ScenarioCheckResult) {
    result.scenarios_checked += 1;

    let scenario = match Scenario::load(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[ERROR] {}: {}", file.display(), e);
            result.load_errors += 1;
            return;
        }
    };

    let report = run_scenario(&scenario, config);
    if report.duplicate_frame_requests > 0 {
        eprintln!(
            "[WARN] {}: {} 次重复帧请求",
            report.name, report.duplicate_frame_requests
        );
    }
    if !report.passed() {
        result.failed.push(report);
    }
}

/// 输出检查结果
fn print_check_result(result: &ScenarioCheckResult) {
    eprintln!("─────────────────────────────────────────────────────");
    eprintln!("回放完成: {} 个场景", result.scenarios_checked);
    eprintln!();

    for report in &result.failed {
        eprintln!("[ERROR] {}:", report.name);
        for failure in &report.failures {
            eprintln!("    {failure}");
        }
    }

    let error_count = result.load_errors + result.failed.len();
    eprintln!();
    if error_count > 0 {
        eprintln!("❌ {} 个场景未通过", error_count);
    } else {
        eprintln!("✅ 检查通过，无错误");
    }
}
