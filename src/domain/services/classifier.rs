// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

use crate::domain::models::category::{CategoryRule, ClassificationConfig, ClassificationResult};
use crate::utils::errors::ClassifierError;

/// 通用登录页分类标识，其得分可被更具体的分类覆盖
pub const LOGIN_CATEGORY: &str = "login";

const LINK_PENALTY: i32 = 15;
const STRUCTURE_BONUS: i32 = 20;
const HIGH_KEYWORD_POINTS: i32 = 10;
const HIGH_KEYWORD_CAP: usize = 5;
const TITLE_META_BONUS: i32 = 10;
const MEDIUM_KEYWORD_POINTS: i32 = 5;
const MEDIUM_KEYWORD_CAP: usize = 7;
const EXCLUDE_PENALTY: i32 = 50;
const LOGIN_OVERRIDE_MARGIN: i32 = 10;
const PAGE_THRESHOLD: i32 = 20;

const LINK_URL_POINTS: i32 = 5;
const LINK_HIGH_POINTS: i32 = 5;
const LINK_MEDIUM_POINTS: i32 = 2;
const LINK_EXCLUDE_PENALTY: i32 = 10;
const LINK_THRESHOLD: i32 = 5;

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("valid selector"));
static META_DESCRIPTION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[name='description']").expect("valid selector"));

/// 预处理后的分类规则
///
/// 关键词已转为小写并去重，结构选择器已编译
struct CompiledRule {
    rule: CategoryRule,
    id_lower: String,
    high: Vec<String>,
    medium: Vec<String>,
    exclude: Vec<String>,
    selectors: Vec<Selector>,
}

impl CompiledRule {
    fn compile(rule: CategoryRule) -> Self {
        let selectors = rule
            .structure_rules
            .iter()
            .filter_map(|s| match Selector::parse(&s.selector) {
                Ok(selector) => Some(selector),
                Err(e) => {
                    warn!(
                        category = %rule.id,
                        selector = %s.selector,
                        "Dropping invalid structure selector: {:?}",
                        e
                    );
                    None
                }
            })
            .collect();

        Self {
            id_lower: rule.id.to_lowercase(),
            high: normalize_keywords(&rule.keywords.high),
            medium: normalize_keywords(&rule.keywords.medium),
            exclude: normalize_keywords(&rule.keywords.exclude),
            selectors,
            rule,
        }
    }

    fn page_score(&self, document: &Html, page: &LoweredPage<'_>, link_count: usize) -> i32 {
        let mut score = 0;

        if self.rule.max_links > 0 && link_count > self.rule.max_links {
            score -= LINK_PENALTY;
        }

        for selector in &self.selectors {
            if document.select(selector).next().is_some() {
                score += STRUCTURE_BONUS;
            }
        }

        let mut high_hits = 0;
        for keyword in &self.high {
            if page.markup.contains(keyword.as_str()) {
                high_hits += 1;
                if high_hits <= HIGH_KEYWORD_CAP {
                    score += HIGH_KEYWORD_POINTS;
                }
            }
            // Title and meta matches are not subject to the body cap.
            if page.title.contains(keyword.as_str()) || page.meta.contains(keyword.as_str()) {
                score += TITLE_META_BONUS;
            }
        }

        let mut medium_hits = 0;
        for keyword in &self.medium {
            if page.markup.contains(keyword.as_str()) {
                medium_hits += 1;
                if medium_hits <= MEDIUM_KEYWORD_CAP {
                    score += MEDIUM_KEYWORD_POINTS;
                }
            }
        }

        for keyword in &self.exclude {
            if page.markup.contains(keyword.as_str()) {
                score -= EXCLUDE_PENALTY;
            }
        }

        score
    }

    fn link_score(&self, url_lower: &str, text_lower: &str) -> i32 {
        let mut score = 0;

        if url_lower.contains(self.id_lower.as_str()) {
            score += LINK_URL_POINTS;
        }
        for keyword in &self.high {
            if text_lower.contains(keyword.as_str()) {
                score += LINK_HIGH_POINTS;
            }
        }
        for keyword in &self.medium {
            if text_lower.contains(keyword.as_str()) {
                score += LINK_MEDIUM_POINTS;
            }
        }
        for keyword in &self.exclude {
            if text_lower.contains(keyword.as_str()) {
                score -= LINK_EXCLUDE_PENALTY;
            }
        }

        score
    }
}

struct LoweredPage<'a> {
    markup: &'a str,
    title: &'a str,
    meta: &'a str,
}

/// 内容分类规则集
///
/// 加载后只读，可在多个工作器之间无锁共享。所有分类方法都是输入的纯函数。
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// 空规则集，所有页面都被分类为未知
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// 从配置结构构建规则集
    ///
    /// 分类标识必须唯一
    pub fn from_config(config: ClassificationConfig) -> Result<Self, ClassifierError> {
        let mut seen = HashSet::new();
        for rule in &config.categories {
            if !seen.insert(rule.id.as_str()) {
                return Err(ClassifierError::DuplicateCategory(rule.id.clone()));
            }
        }

        Ok(Self {
            rules: config
                .categories
                .into_iter()
                .map(CompiledRule::compile)
                .collect(),
        })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ClassifierError> {
        let config: ClassificationConfig = serde_yaml::from_str(yaml)?;
        Self::from_config(config)
    }

    /// 从 YAML 文件加载规则集
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_yaml_str(&content)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 分类标识列表，按规则顺序
    pub fn category_ids(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.rule.id.as_str())
    }

    /// 对页面进行分类
    ///
    /// # 参数
    ///
    /// * `markup` - 原始页面标记
    /// * `title` - 页面标题
    /// * `meta_description` - meta description 内容
    /// * `link_count` - 页面中提取到的链接数量
    pub fn classify(
        &self,
        markup: &str,
        title: &str,
        meta_description: &str,
        link_count: usize,
    ) -> ClassificationResult {
        if self.rules.is_empty() {
            return ClassificationResult::unknown_page();
        }
        let document = Html::parse_document(markup);
        self.classify_document(&document, markup, title, meta_description, link_count)
    }

    /// 对页面进行分类，标题和 meta description 从标记中提取
    pub fn classify_page(&self, markup: &str, link_count: usize) -> ClassificationResult {
        if self.rules.is_empty() {
            return ClassificationResult::unknown_page();
        }
        let document = Html::parse_document(markup);
        self.classify_parsed(&document, markup, link_count)
    }

    /// 对已解析的页面进行分类，避免重复解析
    pub fn classify_parsed(
        &self,
        document: &Html,
        markup: &str,
        link_count: usize,
    ) -> ClassificationResult {
        if self.rules.is_empty() {
            return ClassificationResult::unknown_page();
        }
        let title = page_title(document);
        let meta = meta_description(document);
        self.classify_document(document, markup, &title, &meta, link_count)
    }

    /// 计算每个分类的原始得分，按规则顺序
    pub fn score_all(
        &self,
        markup: &str,
        title: &str,
        meta_description: &str,
        link_count: usize,
    ) -> Vec<(String, i32)> {
        let document = Html::parse_document(markup);
        let scores = self.scores(&document, markup, title, meta_description, link_count);
        self.rules
            .iter()
            .zip(scores)
            .map(|(r, s)| (r.rule.id.clone(), s))
            .collect()
    }

    /// 仅根据锚文本和URL对尚未抓取的链接进行预分类
    pub fn classify_link(&self, url: &str, anchor_text: &str) -> ClassificationResult {
        let url_lower = url.to_lowercase();
        let text_lower = anchor_text.to_lowercase();

        let mut best_score = 0;
        let mut best: Option<&CompiledRule> = None;
        for rule in &self.rules {
            let score = rule.link_score(&url_lower, &text_lower);
            if score > best_score {
                best_score = score;
                best = Some(rule);
            }
        }

        match best {
            Some(rule) if best_score >= LINK_THRESHOLD => {
                ClassificationResult::matched(&rule.rule, best_score)
            }
            _ => ClassificationResult::unknown_link(),
        }
    }

    fn scores(
        &self,
        document: &Html,
        markup: &str,
        title: &str,
        meta_description: &str,
        link_count: usize,
    ) -> Vec<i32> {
        let markup = markup.to_lowercase();
        let title = title.to_lowercase();
        let meta = meta_description.to_lowercase();
        let page = LoweredPage {
            markup: &markup,
            title: &title,
            meta: &meta,
        };

        self.rules
            .iter()
            .map(|rule| rule.page_score(document, &page, link_count))
            .collect()
    }

    fn classify_document(
        &self,
        document: &Html,
        markup: &str,
        title: &str,
        meta_description: &str,
        link_count: usize,
    ) -> ClassificationResult {
        // One scoring pass; the login override reuses these scores.
        let scores = self.scores(document, markup, title, meta_description, link_count);

        let mut best_score = 0;
        let mut best: Option<usize> = None;
        for (idx, score) in scores.iter().enumerate() {
            if *score > best_score {
                best_score = *score;
                best = Some(idx);
            }
        }

        if let Some(login_idx) = best.filter(|&i| self.rules[i].rule.id == LOGIN_CATEGORY) {
            for (idx, score) in scores.iter().enumerate() {
                if idx == login_idx {
                    continue;
                }
                if *score >= best_score - LOGIN_OVERRIDE_MARGIN {
                    best_score = *score;
                    best = Some(idx);
                }
            }
        }

        match best {
            Some(idx) if best_score >= PAGE_THRESHOLD => {
                ClassificationResult::matched(&self.rules[idx].rule, best_score)
            }
            _ => ClassificationResult::unknown_page(),
        }
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// 提取 `<title>` 文本
pub fn page_title(document: &Html) -> String {
    document
        .select(&TITLE_SELECTOR)
        .flat_map(|el| el.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// 提取 `meta[name='description']` 的 content 属性
pub fn meta_description(document: &Html) -> String {
    document
        .select(&META_DESCRIPTION_SELECTOR)
        .next()
        .and_then(|el| el.value().attr("content"))
        .unwrap_or_default()
        .to_string()
}

fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.clone()))
        .collect()
}

#[cfg(test)]
#[path = "classifier_test.rs"]
mod tests;
