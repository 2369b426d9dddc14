//! # fx-sim
//!
//! 在无头宿主上回放效果生命周期场景，不需要浏览器。
//!
//! ## 用法
//!
//! ```bash
//! # 回放单个场景，打印事件轨迹
//! cargo run -p host-cli -- run scenarios/d-frame-fault.json
//!
//! # 以 JSON 输出报告
//! cargo run -p host-cli -- run scenarios/e-low-tier.json --json
//!
//! # 回放目录下所有场景，有期望未满足时返回非零
//! cargo run -p host-cli -- check scenarios
//!
//! # 查看生效的配置
//! cargo run -p host-cli -- config --config fx-config.json
//! ```
//!
//! 配置优先级：命令行参数 > `--config` 文件 > 默认值。

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fx_runtime::{FxConfig, Scenario, ScenarioReport, run_scenario};
use tracing::{debug, error, info};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "fx-sim")]
#[command(about = "效果生命周期模拟器 - 在无头宿主上回放场景")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件（JSON）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// resize 节流间隔（毫秒），覆盖配置文件
    #[arg(long, global = true)]
    throttle_ms: Option<f64>,

    /// 强制开启减少动态效果偏好，覆盖场景环境
    #[arg(long, global = true)]
    reduced_motion: bool,

    /// 日志详细程度（-v: debug，-vv: trace）
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// 回放单个场景
    Run {
        /// 场景文件
        scenario: PathBuf,

        /// 以 JSON 输出报告
        #[arg(long)]
        json: bool,
    },

    /// 回放目录下所有场景并核对期望
    Check {
        /// 场景目录（默认：scenarios）
        #[arg(default_value = "scenarios")]
        dir: PathBuf,
    },

    /// 打印生效的配置
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match real_main(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{e:#}");
            eprintln!("❌ {e:#}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// 返回是否全部通过
fn real_main(cli: Cli) -> anyhow::Result<bool> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Run { scenario, json } => {
            let scenario = load_scenario(&scenario, cli.reduced_motion)?;
            let report = run_scenario(&scenario, &config);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(report.passed())
        }
        Commands::Check { dir } => check_dir(&dir, &config, cli.reduced_motion),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(true)
        }
    }
}

/// 默认值 → 配置文件 → 命令行参数
fn load_config(cli: &Cli) -> anyhow::Result<FxConfig> {
    let mut config = match &cli.config {
        Some(path) => FxConfig::load(path)
            .with_context(|| format!("加载配置 {} 失败", path.display()))?,
        None => FxConfig::default(),
    };
    if let Some(throttle_ms) = cli.throttle_ms {
        config.resize_throttle_ms = throttle_ms;
    }
    config.validate().context("命令行参数无效")?;
    debug!(?config, "生效的配置");
    Ok(config)
}

fn load_scenario(path: &Path, reduced_motion: bool) -> anyhow::Result<Scenario> {
    let mut scenario =
        Scenario::load(path).with_context(|| format!("加载场景 {} 失败", path.display()))?;
    if reduced_motion {
        scenario.environment.reduced_motion = true;
    }
    Ok(scenario)
}

fn check_dir(dir: &Path, config: &FxConfig, reduced_motion: bool) -> anyhow::Result<bool> {
    if !dir.is_dir() {
        anyhow::bail!("场景目录不存在: {}", dir.display());
    }
    let files = collect_scenarios(dir)?;
    if files.is_empty() {
        eprintln!("未找到场景文件（.json）");
        return Ok(true);
    }

    info!(count = files.len(), dir = %dir.display(), "回放场景");
    let mut failed = 0;
    for file in &files {
        let scenario = load_scenario(file, reduced_motion)?;
        let report = run_scenario(&scenario, config);
        if report.passed() {
            eprintln!("✅ {}", report.name);
        } else {
            failed += 1;
            eprintln!("❌ {}", report.name);
            for failure in &report.failures {
                eprintln!("     {failure}");
            }
        }
    }

    eprintln!();
    eprintln!("{} 个场景, {} 个失败", files.len(), failed);
    Ok(failed == 0)
}

fn collect_scenarios(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

fn print_report(report: &ScenarioReport) {
    println!("场景: {} (档位: {})", report.name, report.tier);
    println!("─────────────────────────────────────────────────────");
    for line in &report.trace {
        println!("  {line}");
    }
    println!();
    for (name, effect) in &report.effects {
        let calls = &effect.calls;
        println!(
            "  {name:<12} {:<10} start={} frame={} stop={} resize={} fire={} fault={}",
            effect.state.to_string(),
            calls.starts,
            calls.frames,
            calls.stops,
            calls.resizes,
            calls.fires,
            effect.faults
        );
    }
    println!();
    if report.passed() {
        println!("✅ 期望全部满足");
    } else {
        for failure in &report.failures {
            println!("❌ {failure}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cli_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "resize_throttle_ms": 300 }}"#).unwrap();

        let cli = Cli::parse_from([
            "fx-sim",
            "--config",
            file.path().to_str().unwrap(),
            "config",
        ]);
        assert_eq!(load_config(&cli).unwrap().resize_throttle_ms, 300.0);

        let cli = Cli::parse_from([
            "fx-sim",
            "--config",
            file.path().to_str().unwrap(),
            "--throttle-ms",
            "50",
            "config",
        ]);
        assert_eq!(load_config(&cli).unwrap().resize_throttle_ms, 50.0);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let cli = Cli::parse_from(["fx-sim", "--throttle-ms=-5", "config"]);
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn test_collect_scenarios_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.md"), "").unwrap();

        let files = collect_scenarios(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_check_repository_scenarios() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../scenarios");
        assert!(check_dir(&dir, &FxConfig::default(), false).unwrap());
    }
}
