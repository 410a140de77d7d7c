// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 存储仓库（storage_repository）定义扫描产物的持久化契约，具体实现由基础设施层提供
pub mod storage_repository;
