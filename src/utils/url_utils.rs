// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::{ParseError, Url};

/// 目标缺少协议时使用的默认协议前缀
pub const DEFAULT_SCHEME_PREFIX: &str = "http://";

/// 将可能为相对路径的URL转换为绝对路径URL
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path)
}

/// 将目标地址规范化为完整URL
///
/// 缺少 `http://` 或 `https://` 前缀时补全默认协议
pub fn normalize_target(target: &str) -> String {
    let trimmed = target.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("{}{}", DEFAULT_SCHEME_PREFIX, trimmed)
    }
}

/// 对地址做防误点处理 (`.onion` -> `[.]onion`)
pub fn defang(address: &str) -> String {
    address.replace(".onion", "[.]onion")
}

/// 从目标地址推导出可作为文件名的产物键
pub fn artifact_key(target: &str) -> String {
    target
        .replace("http://", "")
        .replace("https://", "")
        .replace(['/', ':'], "_")
}
