// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

/// 代理定位错误类型
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("SOCKS5握手失败: {0}")]
    Handshake(String),

    #[error("探测超时: {0}")]
    Timeout(String),

    #[error("无效的代理地址: {0}")]
    InvalidEndpoint(String),

    #[error("客户端构建失败: {0}")]
    Client(String),

    /// 所有候选代理都不可用，携带最后一次的底层错误
    #[error("未找到可用的匿名代理 (已尝试 {attempts} 个端点): {last_error}")]
    Unavailable { attempts: usize, last_error: String },
}

/// 分类规则加载错误类型
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML解析错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("重复的分类标识: {0}")]
    DuplicateCategory(String),
}

/// 身份配置加载错误类型
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON解析错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("身份配置列表为空")]
    Empty,
}

/// 目标列表加载错误类型
#[derive(Error, Debug)]
pub enum TargetError {
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

/// Worker错误类型
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("结果通道已关闭: {0}")]
    ChannelClosed(String),
}
