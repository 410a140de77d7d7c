// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use crate::utils::errors::TargetError;
use crate::utils::url_utils::DEFAULT_SCHEME_PREFIX;

// `site.onionjgwe...` -> `site.onion jgwe...`
static GLUED_ONION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\.onion)([a-zA-Z0-9])").expect("valid regex"));

// `site.onion//other.onion` -> `site.onion other.onion`
static SLASH_GLUED_ONION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\.onion)(/+)([a-zA-Z0-9]+\.onion)").expect("valid regex"));

const TRAILING_JUNK: &[char] = &[',', '.', ')', ';', ']', '\'', '"'];

/// 从文件加载扫描目标
///
/// 文件内容为自由文本，可能包含被防误点处理过或相互粘连的地址
pub async fn load_targets(path: impl AsRef<Path>) -> Result<Vec<String>, TargetError> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(parse_targets(&content))
}

/// 从自由文本中解析扫描目标
pub fn parse_targets(content: &str) -> Vec<String> {
    let mut targets = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let line = refang(line);
        let line = GLUED_ONION.replace_all(&line, "${1} ${2}");
        let line = SLASH_GLUED_ONION.replace_all(&line, "${1} ${3}");
        let line = line
            .replace("http://", " http://")
            .replace("https://", " https://");

        for token in line.split_whitespace() {
            let cleaned = token.trim().trim_end_matches(TRAILING_JUNK);
            if cleaned.is_empty() {
                continue;
            }

            if cleaned.contains(".onion") || cleaned.starts_with("http") {
                if cleaned.starts_with("http://") || cleaned.starts_with("https://") {
                    targets.push(cleaned.to_string());
                } else {
                    targets.push(format!("{}{}", DEFAULT_SCHEME_PREFIX, cleaned));
                }
            }
        }
    }

    targets
}

fn refang(line: &str) -> String {
    line.replace("[.]", ".")
        .replace("(.)", ".")
        .replace("[:]", ":")
        .replace("(:)", ":")
}
