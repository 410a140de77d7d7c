// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 提供扫描工作器和批次编排功能
/// 包括单目标流水线、共享队列消费和完成屏障后的结果汇总
pub mod manager;
pub mod scan_worker;
pub mod worker;

pub use manager::ScanOrchestrator;
pub use worker::Worker;
