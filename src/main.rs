// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::Context;
use clap::Parser;
use onionscan::config::settings::Settings;
use onionscan::domain::services::classifier::RuleSet;
use onionscan::domain::services::identity::ProfilePool;
use onionscan::engines::proxy_locator::ProxyLocator;
use onionscan::engines::screenshot_engine::BrowserScreenshotter;
use onionscan::engines::traits::ProxyDiscovery;
use onionscan::infrastructure::report::{
    directory_size, format_size, prepare_output_directory, ReportWriter, RunLog,
};
use onionscan::infrastructure::storage::LocalStorage;
use onionscan::utils::targets::load_targets;
use onionscan::utils::telemetry;
use onionscan::workers::scan_worker::ScanContext;
use onionscan::workers::ScanOrchestrator;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// 通过匿名代理批量扫描隐藏服务页面
#[derive(Parser, Debug)]
#[command(name = "onionscan", version, about)]
struct Cli {
    /// 目标列表文件
    targets: PathBuf,

    /// 并行工作器数量
    #[arg(short, long)]
    workers: Option<usize>,

    /// 身份配置文件 (JSON)
    #[arg(long)]
    user_agents: Option<PathBuf>,

    /// 分类规则文件 (YAML)
    #[arg(long)]
    rules: Option<PathBuf>,

    /// 输出目录
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 跳过截图
    #[arg(long)]
    no_screenshots: bool,

    /// 以 JSON 格式输出日志
    #[arg(long)]
    json_logs: bool,
}

/// 主函数
///
/// 加载配置和输入，执行一个扫描批次并输出汇总
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Initialize logging
    telemetry::init_telemetry(cli.json_logs);
    info!("Starting onionscan...");

    // 2. Load configuration
    let settings = Settings::new().context("failed to load configuration")?;
    info!("Configuration loaded");

    // 3. Load inputs
    let targets = load_targets(&cli.targets)
        .await
        .with_context(|| format!("failed to read targets from {}", cli.targets.display()))?;
    if targets.is_empty() {
        anyhow::bail!("no valid targets found in {}", cli.targets.display());
    }
    info!("Loaded {} targets", targets.len());

    let profiles = load_profiles(
        cli.user_agents
            .clone()
            .or_else(|| settings.profiles.path.clone().map(PathBuf::from)),
    )
    .await;
    let rules = load_rules(
        cli.rules
            .clone()
            .unwrap_or_else(|| PathBuf::from(&settings.classifier.rules_path)),
    )
    .await;

    // 4. Prepare output
    let output_dir = cli
        .output
        .clone()
        .or_else(|| settings.scan.output_dir.clone().map(PathBuf::from))
        .unwrap_or_else(|| default_output_dir(&cli.targets));
    prepare_output_directory(&output_dir)
        .await
        .with_context(|| format!("failed to prepare {}", output_dir.display()))?;

    let run_log = RunLog::open(output_dir.join(&settings.scan.log_file))
        .await
        .context("failed to open run log")?;
    if let Some(path) = run_log.path() {
        info!("Run log: {}", path.display());
    }
    let report = Arc::new(ReportWriter::new(
        Arc::new(LocalStorage::new(&output_dir)),
        Arc::new(run_log),
    ));

    // 5. Proxy and exit address
    let locator = ProxyLocator::from_settings(&settings.proxy, &settings.http)?;
    report_exit_address(&locator).await;

    // 6. Run the batch
    let workers = cli.workers.unwrap_or(settings.scan.workers).max(1);
    let mut context = ScanContext::new(
        Arc::new(locator),
        Arc::new(rules),
        Arc::new(profiles),
        report.clone(),
    );
    if settings.screenshot.enabled && !cli.no_screenshots {
        context = context.with_screenshotter(Arc::new(BrowserScreenshotter::new(
            settings.screenshot.clone(),
        )));
    }

    let targets_name = cli
        .targets
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    report.run_log().header(&targets_name, workers).await;

    let start = Instant::now();
    let summary = ScanOrchestrator::new(context).run(targets, workers).await;
    let duration = start.elapsed();

    let output_size = directory_size(&output_dir)
        .await
        .map(format_size)
        .unwrap_or_else(|_| "unknown".to_string());
    report
        .run_log()
        .footer(&summary, duration, &output_size)
        .await;
    report.run_log().flush().await;

    // 7. Summary
    let mut categories: BTreeMap<&str, usize> = BTreeMap::new();
    for result in &summary.results {
        if let Some(class) = &result.classification {
            *categories.entry(class.category_id.as_str()).or_default() += 1;
        }
    }

    info!(
        total = summary.total,
        success = summary.success,
        failed = summary.failure,
        links = summary.total_links,
        duration_secs = duration.as_secs(),
        output_size = %output_size,
        output_dir = %output_dir.display(),
        "Scan complete"
    );
    for (category, count) in categories {
        info!("  {}: {}", category, count);
    }

    Ok(())
}

async fn load_profiles(path: Option<PathBuf>) -> ProfilePool {
    let Some(path) = path else {
        return ProfilePool::builtin();
    };
    match ProfilePool::load(&path).await {
        Ok(pool) => {
            info!("Loaded {} identity profiles from {}", pool.len(), path.display());
            pool
        }
        Err(e) => {
            warn!(
                "Could not load profiles from {}: {}. Using built-in profiles",
                path.display(),
                e
            );
            ProfilePool::builtin()
        }
    }
}

async fn load_rules(path: PathBuf) -> RuleSet {
    match RuleSet::load(&path).await {
        Ok(rules) => {
            info!("Loaded {} category rules from {}", rules.len(), path.display());
            rules
        }
        Err(e) => {
            warn!(
                "Could not load category rules from {}: {}. Every page will be unknown",
                path.display(),
                e
            );
            RuleSet::empty()
        }
    }
}

/// 输出目录默认为目标文件名（去掉扩展名）
fn default_output_dir(targets: &Path) -> PathBuf {
    targets
        .file_stem()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("onionscan_output"))
}

async fn report_exit_address(locator: &ProxyLocator) {
    let session = match locator.locate().await {
        Ok(session) => session,
        Err(e) => {
            warn!("Proxy not reachable: {}", e);
            return;
        }
    };

    match session.fetcher.exit_address().await {
        Ok(ip) => info!("Proxy {} exit address: {}", session.proxy, ip),
        Err(e) => warn!("Could not determine exit address: {}", e),
    }
}
