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

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::domain::models::profile::IdentityProfile;
use crate::utils::errors::ProxyError;

/// 引擎错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 请求失败
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 响应体读取失败
    #[error("Body read failed: {0}")]
    BodyFailed(String),
    /// 超时
    #[error("Timeout after {0:?}")]
    Timeout(Duration),
    /// 浏览器错误
    #[error("Browser error: {0}")]
    Browser(String),
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

/// 匿名代理端点 (host:port)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyEndpoint {
    pub host: String,
    pub port: u16,
}

impl ProxyEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `socks5h://` 代理地址，由代理端完成域名解析
    pub fn socks5h_url(&self) -> String {
        format!("socks5h://{}", self)
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // IPv6 literals need brackets in host:port form
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for ProxyEndpoint {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| ProxyError::InvalidEndpoint(s.to_string()))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| ProxyError::InvalidEndpoint(s.to_string()))?;
        let host = match host.strip_prefix('[') {
            Some(inner) => inner
                .strip_suffix(']')
                .ok_or_else(|| ProxyError::InvalidEndpoint(s.to_string()))?,
            None => host,
        };
        if host.is_empty() {
            return Err(ProxyError::InvalidEndpoint(s.to_string()));
        }
        Ok(Self::new(host, port))
    }
}

/// 抓取到的页面
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP状态码
    pub status_code: u16,
    /// 响应内容
    pub body: String,
    /// 内容类型
    pub content_type: Option<String>,
    /// Server 响应头
    pub server: Option<String>,
    /// 响应时间（毫秒）
    pub response_time_ms: u64,
}

/// 页面抓取特质
///
/// 一次 GET 请求，不重试
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, profile: &IdentityProfile)
        -> Result<FetchedPage, EngineError>;

    /// 查询经由本抓取器出网时的出口IP地址
    async fn exit_address(&self) -> Result<String, EngineError> {
        Err(EngineError::Other(
            "exit address lookup not supported".to_string(),
        ))
    }
}

/// 截图特质
#[async_trait]
pub trait ScreenshotCapturer: Send + Sync {
    /// 通过代理对页面截图，返回图片字节
    async fn capture(&self, url: &str, proxy: &ProxyEndpoint) -> Result<Vec<u8>, EngineError>;
}

/// 已定位的网络会话：可用代理及绑定到该代理的抓取客户端
#[derive(Clone)]
pub struct NetworkSession {
    pub proxy: ProxyEndpoint,
    pub fetcher: Arc<dyn PageFetcher>,
}

/// 代理发现特质
#[async_trait]
pub trait ProxyDiscovery: Send + Sync {
    /// 返回第一个可用的代理会话，全部失败时返回聚合错误
    async fn locate(&self) -> Result<NetworkSession, ProxyError>;
}
