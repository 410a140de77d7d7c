// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：扫描结果、分类规则和身份配置
/// - 仓库接口（repositories）：产物持久化抽象接口
/// - 服务（services）：内容分类、链接提取和身份抽取
pub mod models;
pub mod repositories;
pub mod services;
