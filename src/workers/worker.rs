// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::errors::WorkerError;
use async_trait::async_trait;

/// Worker trait定义
///
/// 扫描池中的每个工作器都实现此trait，`run` 在队列取空后返回
#[async_trait]
pub trait Worker: Send + Sync {
    /// 运行工作器，返回本工作器处理的目标数量
    async fn run(&self) -> Result<usize, WorkerError>;

    /// 获取工作器名称
    fn name(&self) -> &str;
}
