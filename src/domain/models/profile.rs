// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 客户端身份配置
///
/// 一个 User-Agent 与其配套请求头的组合
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IdentityProfile {
    pub name: String,
    pub user_agent: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}
