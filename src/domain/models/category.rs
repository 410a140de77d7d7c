// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 分类规则文件的顶层结构
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClassificationConfig {
    #[serde(default)]
    pub categories: Vec<CategoryRule>,
}

/// 单个内容分类的规则
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CategoryRule {
    /// 分类标识（规则集中唯一）
    pub id: String,
    /// 显示名称
    #[serde(default)]
    pub name: String,
    /// 显示标签，例如 `[FORUM]`
    pub tag: String,
    /// 显示颜色
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub priority: i32,
    /// 关键词分级
    #[serde(default)]
    pub keywords: KeywordRules,
    /// 结构选择器规则
    #[serde(default)]
    pub structure_rules: Vec<StructureRule>,
    /// 链接数量上限，0 表示不限制
    #[serde(default)]
    pub max_links: usize,
}

/// 关键词分级规则
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KeywordRules {
    #[serde(default)]
    pub high: Vec<String>,
    #[serde(default)]
    pub medium: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// 结构选择器规则 (CSS选择器)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StructureRule {
    pub selector: String,
}

/// 分类结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub category_id: String,
    pub tag: String,
    pub color: String,
    pub score: i32,
    pub is_unknown: bool,
}

impl ClassificationResult {
    pub const UNKNOWN_ID: &'static str = "unknown";

    /// 页面分类的未知结果
    pub fn unknown_page() -> Self {
        Self::unknown("[UNKNOWN]")
    }

    /// 链接上下文分类的未知结果
    pub fn unknown_link() -> Self {
        Self::unknown("[?]")
    }

    fn unknown(tag: &str) -> Self {
        Self {
            category_id: Self::UNKNOWN_ID.to_string(),
            tag: tag.to_string(),
            color: "gray".to_string(),
            score: 0,
            is_unknown: true,
        }
    }

    pub(crate) fn matched(rule: &CategoryRule, score: i32) -> Self {
        Self {
            category_id: rule.id.clone(),
            tag: rule.tag.clone(),
            color: rule.color.clone(),
            score,
            is_unknown: false,
        }
    }
}

fn default_color() -> String {
    "white".to_string()
}
