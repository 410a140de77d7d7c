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

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use scraper::Html;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::domain::models::category::ClassificationResult;
use crate::domain::models::profile::IdentityProfile;
use crate::domain::models::scan_result::{FailureKind, ScanFailure, ScanResult};
use crate::domain::services::classifier::RuleSet;
use crate::domain::services::identity::ProfilePool;
use crate::domain::services::link_extractor::{ExtractedLink, LinkExtractor};
use crate::engines::traits::{
    EngineError, FetchedPage, NetworkSession, ProxyDiscovery, ScreenshotCapturer,
};
use crate::infrastructure::report::{LogLevel, ReportWriter};
use crate::utils::errors::WorkerError;
use crate::utils::url_utils::{defang, normalize_target};
use crate::workers::worker::Worker;

/// 预先装载全部目标的共享队列，元素为 (提交序号, 目标)
pub type TargetQueue = Arc<Mutex<VecDeque<(usize, String)>>>;

/// 结果通道发送端
pub type ResultSender = mpsc::UnboundedSender<(usize, ScanResult)>;

/// 扫描上下文
///
/// 一个批次内所有工作器共享的只读协作者，显式传入而不是使用全局状态
pub struct ScanContext {
    pub discovery: Arc<dyn ProxyDiscovery>,
    pub rules: Arc<RuleSet>,
    pub profiles: Arc<ProfilePool>,
    /// 身份抽取的随机源，测试中可注入固定种子
    pub rng: Arc<Mutex<StdRng>>,
    /// 截图协作者，未设置时跳过截图
    pub screenshotter: Option<Arc<dyn ScreenshotCapturer>>,
    pub report: Arc<ReportWriter>,
}

impl ScanContext {
    pub fn new(
        discovery: Arc<dyn ProxyDiscovery>,
        rules: Arc<RuleSet>,
        profiles: Arc<ProfilePool>,
        report: Arc<ReportWriter>,
    ) -> Self {
        Self {
            discovery,
            rules,
            profiles,
            rng: Arc::new(Mutex::new(StdRng::from_os_rng())),
            screenshotter: None,
            report,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Arc::new(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }

    pub fn with_screenshotter(mut self, screenshotter: Arc<dyn ScreenshotCapturer>) -> Self {
        self.screenshotter = Some(screenshotter);
        self
    }

    /// 随机抽取一个身份配置
    pub fn pick_profile(&self) -> IdentityProfile {
        let mut rng = self.rng.lock();
        self.profiles.pick(&mut *rng).clone()
    }
}

/// 页面分析结果
struct PageAnalysis {
    links: Vec<(ExtractedLink, ClassificationResult)>,
    classification: ClassificationResult,
}

/// 解析页面、提取链接并分类
///
/// 同步完成，解析出的文档不会跨越 await 点
fn analyze_page(rules: &RuleSet, url: &str, body: &str) -> PageAnalysis {
    let document = Html::parse_document(body);
    let base = Url::parse(url).ok();

    let links: Vec<_> = LinkExtractor::extract_from_document(&document, base.as_ref())
        .into_iter()
        .map(|link| {
            let class = rules.classify_link(&link.href, &link.text);
            (link, class)
        })
        .collect();
    let classification = rules.classify_parsed(&document, body, links.len());

    PageAnalysis {
        links,
        classification,
    }
}

/// 扫描工作器
///
/// 从共享队列中领取目标，逐个执行 抓取 -> 提取链接 -> 分类 -> 截图 -> 保存 流水线
pub struct ScanWorker {
    name: String,
    context: Arc<ScanContext>,
    session: Option<NetworkSession>,
    queue: TargetQueue,
    results: ResultSender,
}

impl ScanWorker {
    /// 创建新的扫描工作器
    ///
    /// `session` 为 `None` 表示本批次没有可用代理，所有目标将直接失败
    pub fn new(
        id: usize,
        context: Arc<ScanContext>,
        session: Option<NetworkSession>,
        queue: TargetQueue,
        results: ResultSender,
    ) -> Self {
        Self {
            name: format!("scan-worker-{}", id),
            context,
            session,
            queue,
            results,
        }
    }

    /// 扫描单个目标
    ///
    /// 总是返回一个结果，失败作为值记录在结果中
    #[instrument(skip(self), fields(worker = %self.name))]
    pub async fn scan_target(&self, target: &str) -> ScanResult {
        let Some(session) = self.session.as_ref() else {
            return ScanResult::failed(
                target,
                ScanFailure::new(
                    FailureKind::ProxyUnavailable,
                    "no anonymizing proxy was located for this batch",
                ),
            );
        };

        let report = &self.context.report;
        let url = normalize_target(target);
        let profile = self.context.pick_profile();

        report
            .log(
                LogLevel::Info,
                format!("Scanning {} (profile: {})", url, profile.name),
            )
            .await;

        let page = match session.fetcher.fetch(&url, &profile).await {
            Ok(page) => page,
            Err(e) => return self.fetch_failed(target, &url, &profile, e).await,
        };

        self.log_response(&url, &page).await;

        let analysis = analyze_page(&self.context.rules, &url, &page.body);
        let link_count = analysis.links.len();
        debug!(
            url = %url,
            link_count,
            category = %analysis.classification.category_id,
            score = analysis.classification.score,
            "Page classified"
        );

        self.persist_page(&url, &page.body, &analysis).await;
        self.capture_screenshot(&url, session).await;

        ScanResult::succeeded(
            target,
            page.status_code,
            link_count,
            analysis.classification,
            profile.name,
        )
    }

    async fn fetch_failed(
        &self,
        target: &str,
        url: &str,
        profile: &IdentityProfile,
        err: EngineError,
    ) -> ScanResult {
        let report = &self.context.report;
        let kind = match err {
            EngineError::BodyFailed(_) => {
                error!("Failed to read response body for {}: {}", url, err);
                report
                    .log(
                        LogLevel::Error,
                        format!("Could not read response body [{}]: {}", url, err),
                    )
                    .await;
                FailureKind::Body
            }
            _ => {
                warn!("Fetch failed for {}: {}", url, err);
                report
                    .log(LogLevel::Failed, format!("Access failed [{}]: {}", url, err))
                    .await;
                FailureKind::Fetch
            }
        };

        ScanResult::failed(target, ScanFailure::new(kind, err.to_string()))
            .with_profile(profile.name.clone())
    }

    async fn log_response(&self, url: &str, page: &FetchedPage) {
        if !(200..300).contains(&page.status_code) {
            warn!("Non-success status {} for {}", page.status_code, url);
        }

        self.context
            .report
            .log(
                LogLevel::Debug,
                format!(
                    "Response received [{}] - Status: {}, Size: {}, Type: {}, Server: {}, Elapsed: {}ms",
                    url,
                    page.status_code,
                    page.body.len(),
                    page.content_type.as_deref().unwrap_or("-"),
                    page.server.as_deref().unwrap_or("-"),
                    page.response_time_ms
                ),
            )
            .await;
    }

    /// 保存页面和链接，失败只记录日志
    async fn persist_page(&self, url: &str, body: &str, analysis: &PageAnalysis) {
        let report = &self.context.report;

        match report.save_page(url, body).await {
            Ok(()) => report.log(LogLevel::Info, format!("HTML saved: {}", url)).await,
            Err(e) => {
                error!("Failed to save page for {}: {}", url, e);
                report
                    .log(LogLevel::Error, format!("Could not save HTML for {}: {}", url, e))
                    .await;
            }
        }

        if let Err(e) = report.save_links(url, &analysis.links).await {
            error!("Failed to save links for {}: {}", url, e);
            report
                .log(LogLevel::Error, format!("Could not save links for {}: {}", url, e))
                .await;
        }

        if analysis.links.is_empty() {
            report
                .log(LogLevel::Info, format!("No links found on {}", url))
                .await;
            return;
        }

        report
            .log(
                LogLevel::Info,
                format!("{} links found on {}", analysis.links.len(), url),
            )
            .await;
        for (link, class) in &analysis.links {
            report
                .log(
                    LogLevel::Link,
                    format!("  -> {} {}", class.tag, defang(&link.href)),
                )
                .await;
        }
    }

    /// 尽力截图，失败不影响目标结果
    async fn capture_screenshot(&self, url: &str, session: &NetworkSession) {
        let Some(screenshotter) = self.context.screenshotter.as_ref() else {
            return;
        };
        let report = &self.context.report;
        let start = Instant::now();

        match screenshotter.capture(url, &session.proxy).await {
            Ok(bytes) => match report.save_screenshot(url, &bytes).await {
                Ok(()) => {
                    report
                        .log(
                            LogLevel::Success,
                            format!(
                                "Screenshot saved for {} ({:.2}s)",
                                url,
                                start.elapsed().as_secs_f64()
                            ),
                        )
                        .await
                }
                Err(e) => {
                    error!("Failed to save screenshot for {}: {}", url, e);
                    report
                        .log(
                            LogLevel::Error,
                            format!("Could not save screenshot for {}: {}", url, e),
                        )
                        .await;
                }
            },
            Err(e) => {
                warn!("Screenshot failed for {}: {}", url, e);
                report
                    .log(
                        LogLevel::Failed,
                        format!("Screenshot failed for {}: {}", url, e),
                    )
                    .await;
            }
        }
    }
}

#[async_trait]
impl Worker for ScanWorker {
    async fn run(&self) -> Result<usize, WorkerError> {
        let mut processed = 0;
        info!("{} started", self.name);

        loop {
            // The queue lock is released before any await.
            let next = self.queue.lock().pop_front();
            let Some((index, target)) = next else {
                break;
            };

            let result = self.scan_target(&target).await;
            self.results
                .send((index, result))
                .map_err(|e| WorkerError::ChannelClosed(e.to_string()))?;
            processed += 1;
        }

        info!("{} finished after {} targets", self.name, processed);
        Ok(processed)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
