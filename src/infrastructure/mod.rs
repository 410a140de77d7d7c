// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 该模块包含扫描产物的持久化实现：
/// - 存储（storage）：本地文件系统和内存存储
/// - 报告（report）：产物写入器和批次运行日志
///
/// 基础设施层依赖于领域层的存储仓库接口。
pub mod report;
pub mod storage;
