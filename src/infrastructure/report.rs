// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Local;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::domain::models::category::ClassificationResult;
use crate::domain::models::scan_result::ScanSummary;
use crate::domain::repositories::storage_repository::{StorageError, StorageRepository};
use crate::domain::services::link_extractor::ExtractedLink;
use crate::utils::url_utils::{artifact_key, defang};

/// 运行日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Debug,
    Success,
    Warning,
    Error,
    Failed,
    Link,
    Critical,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Success => "SUCCESS",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Failed => "FAILED",
            LogLevel::Link => "LINK",
            LogLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 批次运行日志
///
/// 追加写入，每次写入在互斥锁内完成，锁只覆盖单次写入
pub struct RunLog {
    path: Option<PathBuf>,
    file: Mutex<Option<fs::File>>,
}

impl RunLog {
    /// 以追加模式打开日志文件，不存在时创建
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path: Some(path),
            file: Mutex::new(Some(file)),
        })
    }

    /// 不落盘的日志，用于测试或未配置输出时
    pub fn disabled() -> Self {
        Self {
            path: None,
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// 写入一行日志，写入失败只通过 tracing 记录
    pub async fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        let line = format_line(level, message.as_ref());
        let mut guard = self.file.lock().await;
        if let Some(file) = guard.as_mut() {
            if let Err(e) = file.write_all(line.as_bytes()).await {
                warn!("Failed to write run log: {}", e);
            }
        }
    }

    /// 批次开始标记
    pub async fn header(&self, targets_file: &str, workers: usize) {
        self.log(LogLevel::Info, "==================== SCAN STARTED ====================")
            .await;
        self.log(LogLevel::Info, format!("Target file: {}", targets_file))
            .await;
        self.log(LogLevel::Info, format!("Workers: {}", workers)).await;
        self.log(
            LogLevel::Info,
            format!("Start time: {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
        )
        .await;
    }

    /// 批次结束标记
    pub async fn footer(&self, summary: &ScanSummary, duration: Duration, output_size: &str) {
        self.log(LogLevel::Info, "==================== SCAN FINISHED ===================")
            .await;
        self.log(
            LogLevel::Info,
            format!(
                "Total: {} | Success: {} | Failed: {} | Links: {}",
                summary.total, summary.success, summary.failure, summary.total_links
            ),
        )
        .await;
        self.log(
            LogLevel::Info,
            format!("Duration: {:.2}s | Output size: {}", duration.as_secs_f64(), output_size),
        )
        .await;
    }

    /// 刷新底层文件
    pub async fn flush(&self) {
        let mut guard = self.file.lock().await;
        if let Some(file) = guard.as_mut() {
            if let Err(e) = file.flush().await {
                warn!("Failed to flush run log: {}", e);
            }
        }
    }
}

/// 格式化一行运行日志: `[YYYY-MM-DD HH:MM:SS] [LEVEL] message`
pub fn format_line(level: LogLevel, message: &str) -> String {
    format!(
        "[{}] [{}] {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        level,
        message
    )
}

/// 扫描产物写入器
///
/// 通过存储仓库保存页面、链接和截图，并持有本批次的运行日志
pub struct ReportWriter {
    storage: Arc<dyn StorageRepository>,
    run_log: Arc<RunLog>,
}

impl ReportWriter {
    pub fn new(storage: Arc<dyn StorageRepository>, run_log: Arc<RunLog>) -> Self {
        Self { storage, run_log }
    }

    pub fn run_log(&self) -> &RunLog {
        &self.run_log
    }

    pub async fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        self.run_log.log(level, message).await;
    }

    /// 保存页面内容为 `<key>.html`
    pub async fn save_page(&self, target: &str, body: &str) -> Result<(), StorageError> {
        let key = format!("{}.html", artifact_key(target));
        self.storage.save(&key, body.as_bytes()).await
    }

    /// 保存链接列表为 `<key>.links.txt`，每行一个已防误点的链接及其预分类标签
    ///
    /// 没有链接时同样写出空文件
    pub async fn save_links(
        &self,
        target: &str,
        links: &[(ExtractedLink, ClassificationResult)],
    ) -> Result<(), StorageError> {
        let key = format!("{}.links.txt", artifact_key(target));
        let mut content = String::new();
        for (link, class) in links {
            content.push_str(&format!("{} {}\n", class.tag, defang(&link.href)));
        }
        self.storage.save(&key, content.as_bytes()).await
    }

    /// 保存截图为 `<key>.png`
    pub async fn save_screenshot(&self, target: &str, data: &[u8]) -> Result<(), StorageError> {
        let key = format!("{}.png", artifact_key(target));
        self.storage.save(&key, data).await
    }
}

/// 准备输出目录：已存在时清空后重建
pub async fn prepare_output_directory(dir: impl AsRef<Path>) -> std::io::Result<()> {
    let dir = dir.as_ref();
    if fs::try_exists(dir).await? {
        fs::remove_dir_all(dir).await?;
    }
    fs::create_dir_all(dir).await
}

/// 统计目录下所有文件的总大小（字节）
pub async fn directory_size(dir: impl AsRef<Path>) -> std::io::Result<u64> {
    let mut total = 0u64;
    let mut pending = vec![dir.as_ref().to_path_buf()];

    while let Some(current) = pending.pop() {
        let mut entries = fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_dir() {
                pending.push(entry.path());
            } else {
                total += metadata.len();
            }
        }
    }

    Ok(total)
}

/// 以人类可读形式显示字节数
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}
