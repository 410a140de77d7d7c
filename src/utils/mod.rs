// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
/// 包括错误类型、遥测初始化、目标列表解析和URL处理
pub mod errors;
pub mod targets;
pub mod telemetry;
pub mod url_utils;
