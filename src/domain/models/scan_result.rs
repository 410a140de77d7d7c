// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Serialize;
use std::fmt;

use crate::domain::models::category::ClassificationResult;

/// 单个目标失败的原因类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 本批次未找到可用代理
    ProxyUnavailable,
    /// 请求失败（DNS、连接、超时、协议错误）
    Fetch,
    /// 响应体读取失败
    Body,
    /// 工作器在产出结果前意外终止
    WorkerLost,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::ProxyUnavailable => "proxy unavailable",
            FailureKind::Fetch => "fetch failed",
            FailureKind::Body => "body read failed",
            FailureKind::WorkerLost => "worker lost",
        };
        write!(f, "{}", s)
    }
}

/// 失败详情
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ScanFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ScanFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// 单个目标的扫描结果
///
/// 每个目标在每个批次中恰好产生一个结果
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub target: String,
    pub success: bool,
    pub status_code: Option<u16>,
    pub failure: Option<ScanFailure>,
    pub link_count: usize,
    pub classification: Option<ClassificationResult>,
    /// 本次请求使用的身份配置名称
    pub profile: Option<String>,
}

impl ScanResult {
    pub fn succeeded(
        target: impl Into<String>,
        status_code: u16,
        link_count: usize,
        classification: ClassificationResult,
        profile: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            success: true,
            status_code: Some(status_code),
            failure: None,
            link_count,
            classification: Some(classification),
            profile: Some(profile.into()),
        }
    }

    pub fn failed(target: impl Into<String>, failure: ScanFailure) -> Self {
        Self {
            target: target.into(),
            success: false,
            status_code: None,
            failure: Some(failure),
            link_count: 0,
            classification: None,
            profile: None,
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn is_proxy_unavailable(&self) -> bool {
        matches!(
            self.failure,
            Some(ScanFailure {
                kind: FailureKind::ProxyUnavailable,
                ..
            })
        )
    }
}

/// 批次汇总
///
/// 只在整个批次完成后构造
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    pub total: usize,
    pub success: usize,
    pub failure: usize,
    pub total_links: usize,
    /// 按提交顺序排列的结果
    pub results: Vec<ScanResult>,
}
