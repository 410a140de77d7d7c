// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use rand::Rng;
use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::models::profile::IdentityProfile;
use crate::utils::errors::ProfileError;

const TOR_BROWSER_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; rv:128.0) Gecko/20100101 Firefox/128.0";
const FIREFOX_LINUX_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
const CHROME_WINDOWS_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const SAFARI_MAC_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15";

/// 客户端身份配置池
///
/// 加载后只读，每次请求随机抽取一个身份
#[derive(Debug, Clone)]
pub struct ProfilePool {
    profiles: Vec<IdentityProfile>,
}

impl ProfilePool {
    /// 使用给定的身份列表创建配置池
    pub fn new(profiles: Vec<IdentityProfile>) -> Result<Self, ProfileError> {
        if profiles.is_empty() {
            return Err(ProfileError::Empty);
        }
        Ok(Self { profiles })
    }

    /// 内置默认身份列表
    pub fn builtin() -> Self {
        let firefox_headers = headers(&[
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
            ("Accept-Language", "en-US,en;q=0.5"),
            ("Upgrade-Insecure-Requests", "1"),
        ]);

        Self {
            profiles: vec![
                IdentityProfile {
                    name: "Tor Browser".to_string(),
                    user_agent: TOR_BROWSER_UA.to_string(),
                    headers: firefox_headers.clone(),
                },
                IdentityProfile {
                    name: "Firefox Linux".to_string(),
                    user_agent: FIREFOX_LINUX_UA.to_string(),
                    headers: firefox_headers,
                },
                IdentityProfile {
                    name: "Chrome Windows".to_string(),
                    user_agent: CHROME_WINDOWS_UA.to_string(),
                    headers: headers(&[
                        ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"),
                        ("Accept-Language", "en-US,en;q=0.9"),
                        ("Upgrade-Insecure-Requests", "1"),
                    ]),
                },
                IdentityProfile {
                    name: "Safari macOS".to_string(),
                    user_agent: SAFARI_MAC_UA.to_string(),
                    headers: headers(&[
                        ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
                        ("Accept-Language", "en-US,en;q=0.9"),
                    ]),
                },
            ],
        }
    }

    /// 从 JSON 字符串解析身份列表
    pub fn from_json_str(json: &str) -> Result<Self, ProfileError> {
        let profiles: Vec<IdentityProfile> = serde_json::from_str(json)?;
        let profiles = profiles
            .into_iter()
            .filter(|p| !p.user_agent.trim().is_empty())
            .collect();
        Self::new(profiles)
    }

    /// 从 JSON 文件加载身份列表
    ///
    /// 文件不可读、格式错误或为空时返回错误，由调用方回退到内置列表
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json_str(&content)
    }

    /// 随机抽取一个身份
    pub fn pick<R: Rng>(&self, rng: &mut R) -> &IdentityProfile {
        &self.profiles[rng.random_range(0..self.profiles.len())]
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for ProfilePool {
    fn default() -> Self {
        Self::builtin()
    }
}

fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
