// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含扫描结果、分类规则等核心实体，以及分类、链接提取等纯领域服务
pub mod domain;

/// 引擎模块
///
/// 代理定位、页面抓取和截图引擎
pub mod engines;

/// 基础设施模块
///
/// 提供产物存储和运行日志
pub mod infrastructure;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 实现扫描工作器池和批次编排
pub mod workers;
