// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scan_result::{FailureKind, ScanFailure, ScanResult, ScanSummary};
use crate::infrastructure::report::LogLevel;
use crate::workers::scan_worker::{ScanContext, ScanWorker, TargetQueue};
use crate::workers::worker::Worker;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// 扫描编排器
///
/// 每个批次定位一次代理，然后由固定数量的工作器消费共享队列。
/// 所有工作器退出后才开始汇总，保证每个目标恰好一个结果。
pub struct ScanOrchestrator {
    context: Arc<ScanContext>,
}

impl ScanOrchestrator {
    pub fn new(context: ScanContext) -> Self {
        Self {
            context: Arc::new(context),
        }
    }

    /// 执行一个扫描批次
    ///
    /// # 参数
    ///
    /// * `targets` - 目标列表，按提交顺序
    /// * `workers` - 并行工作器数量，0 按 1 处理
    ///
    /// # 返回值
    ///
    /// 批次汇总，`results` 按提交顺序排列
    pub async fn run(&self, targets: Vec<String>, workers: usize) -> ScanSummary {
        let total = targets.len();
        let report = &self.context.report;

        let session = match self.context.discovery.locate().await {
            Ok(session) => {
                report
                    .log(
                        LogLevel::Info,
                        format!("Anonymizing proxy located at {}", session.proxy),
                    )
                    .await;
                Some(session)
            }
            Err(e) => {
                error!("Proxy discovery failed: {}", e);
                report
                    .log(
                        LogLevel::Critical,
                        format!("No anonymizing proxy available: {}", e),
                    )
                    .await;
                None
            }
        };

        let queue: TargetQueue = Arc::new(Mutex::new(
            targets.iter().cloned().enumerate().collect::<VecDeque<_>>(),
        ));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let worker_count = workers.max(1);
        info!(total, workers = worker_count, "Starting scan batch");

        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let worker = ScanWorker::new(
                id + 1,
                self.context.clone(),
                session.clone(),
                queue.clone(),
                tx.clone(),
            );
            let handle = tokio::spawn(async move {
                if let Err(e) = worker.run().await {
                    error!("{} stopped: {}", worker.name(), e);
                }
            });
            handles.push(handle);
        }
        // Only worker clones keep the channel open now.
        drop(tx);

        // Completion barrier
        for outcome in futures::future::join_all(handles).await {
            if let Err(e) = outcome {
                error!("Scan worker task ended abnormally: {}", e);
            }
        }

        let mut slots: Vec<Option<ScanResult>> = vec![None; total];
        while let Some((index, result)) = rx.recv().await {
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(result);
            }
        }

        let mut summary = ScanSummary {
            total,
            ..ScanSummary::default()
        };
        for (slot, target) in slots.into_iter().zip(targets) {
            let result = slot.unwrap_or_else(|| {
                warn!("No result recorded for {}", target);
                ScanResult::failed(
                    target,
                    ScanFailure::new(
                        FailureKind::WorkerLost,
                        "worker terminated before reporting a result",
                    ),
                )
            });
            self.record(&mut summary, result).await;
        }

        info!(
            total = summary.total,
            success = summary.success,
            failure = summary.failure,
            links = summary.total_links,
            "Scan batch finished"
        );
        summary
    }

    async fn record(&self, summary: &mut ScanSummary, result: ScanResult) {
        let report = &self.context.report;

        if result.success {
            summary.success += 1;
            summary.total_links += result.link_count;

            let status = result.status_code.unwrap_or_default();
            let reason = reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("");
            let level = if (200..300).contains(&status) {
                LogLevel::Success
            } else {
                LogLevel::Warning
            };
            let category = result
                .classification
                .as_ref()
                .map(|c| c.tag.as_str())
                .unwrap_or("");
            report
                .log(
                    level,
                    format!(
                        "{} - {} {} {} (links: {}, profile: {})",
                        result.target,
                        status,
                        reason,
                        category,
                        result.link_count,
                        result.profile.as_deref().unwrap_or("-")
                    ),
                )
                .await;
        } else {
            summary.failure += 1;

            let detail = if result.is_proxy_unavailable() {
                "(proxy unavailable)"
            } else {
                "(access error)"
            };
            report
                .log(LogLevel::Failed, format!("{} {}", result.target, detail))
                .await;
        }

        summary.results.push(result);
    }
}
