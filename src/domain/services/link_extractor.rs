// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Serialize;
use url::Url;

use crate::utils::url_utils;

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));

/// 从页面中提取的链接
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedLink {
    /// 链接目标
    pub href: String,
    /// 锚文本（已折叠空白）
    pub text: String,
}

/// 链接提取器
///
/// 负责从HTML内容中按文档顺序提取超链接
pub struct LinkExtractor;

impl LinkExtractor {
    /// 从HTML内容中提取链接
    ///
    /// 空链接、片段链接 (`#...`) 和 `javascript:` 链接会被忽略，重复链接保留。
    /// 提供 `base_url` 时相对链接会被解析为绝对地址，无法解析的保持原样。
    ///
    /// # 参数
    ///
    /// * `html_content` - HTML内容
    /// * `base_url` - 页面地址
    ///
    /// # 返回值
    ///
    /// 按出现顺序排列的链接列表；标记损坏时返回解析器能恢复的部分，可能为空
    pub fn extract_links(html_content: &str, base_url: Option<&Url>) -> Vec<ExtractedLink> {
        let document = Html::parse_document(html_content);
        Self::extract_from_document(&document, base_url)
    }

    pub fn extract_from_document(document: &Html, base_url: Option<&Url>) -> Vec<ExtractedLink> {
        let mut links = Vec::new();

        for element in document.select(&ANCHOR_SELECTOR) {
            let Some(raw) = element.value().attr("href") else {
                continue;
            };
            let href = raw.trim();
            if href.is_empty()
                || href.starts_with('#')
                || href.to_ascii_lowercase().starts_with("javascript:")
            {
                continue;
            }

            let href = match base_url {
                Some(base) => url_utils::resolve_url(base, href)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| href.to_string()),
                None => href.to_string(),
            };

            let text = element
                .text()
                .flat_map(str::split_whitespace)
                .collect::<Vec<_>>()
                .join(" ");

            links.push(ExtractedLink { href, text });
        }

        links
    }
}
