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

use crate::config::settings::HttpSettings;
use crate::domain::models::profile::IdentityProfile;
use crate::engines::traits::{EngineError, FetchedPage, PageFetcher, ProxyEndpoint};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, SERVER, USER_AGENT};
use std::time::Instant;
use tracing::debug;

/// 抓取客户端
///
/// 基于reqwest实现，整个批次共享同一个客户端及其连接池
#[derive(Clone)]
pub struct FetchClient {
    client: reqwest::Client,
    ip_check_url: String,
}

impl FetchClient {
    /// 创建绑定到匿名代理的客户端
    ///
    /// 使用 `socks5h` 让代理端解析隐藏服务地址
    pub fn with_proxy(proxy: &ProxyEndpoint, settings: &HttpSettings) -> Result<Self, EngineError> {
        let proxy = reqwest::Proxy::all(proxy.socks5h_url())
            .map_err(|e| EngineError::Other(format!("Invalid proxy: {}", e)))?;
        Self::build(Some(proxy), settings)
    }

    /// 创建直连客户端
    pub fn direct(settings: &HttpSettings) -> Result<Self, EngineError> {
        Self::build(None, settings)
    }

    fn build(proxy: Option<reqwest::Proxy>, settings: &HttpSettings) -> Result<Self, EngineError> {
        let mut builder = reqwest::Client::builder()
            .timeout(settings.timeout())
            .pool_max_idle_per_host(settings.pool_max_idle_per_host)
            .pool_idle_timeout(settings.pool_idle_timeout());

        // Handle proxy
        builder = match proxy {
            Some(proxy) => builder.proxy(proxy),
            None => builder.no_proxy(),
        };

        Ok(Self {
            client: builder.build()?,
            ip_check_url: settings.ip_check_url.clone(),
        })
    }
}

#[async_trait]
impl PageFetcher for FetchClient {
    /// 执行一次GET请求
    ///
    /// # 参数
    ///
    /// * `url` - 完整的目标地址
    /// * `profile` - 本次请求使用的身份配置
    ///
    /// # 返回值
    ///
    /// * `Ok(FetchedPage)` - 任何HTTP状态都视为抓取成功
    /// * `Err(EngineError)` - 连接、超时、协议错误或响应体读取失败
    async fn fetch(
        &self,
        url: &str,
        profile: &IdentityProfile,
    ) -> Result<FetchedPage, EngineError> {
        // Build headers
        let mut headers = HeaderMap::new();
        if let Ok(ua) = HeaderValue::from_str(&profile.user_agent) {
            headers.insert(USER_AGENT, ua);
        }
        for (k, v) in &profile.headers {
            if let (Ok(k), Ok(v)) = (
                HeaderName::from_bytes(k.as_bytes()),
                HeaderValue::from_str(v),
            ) {
                headers.insert(k, v);
            }
        }

        let start = Instant::now();
        let response = self.client.get(url).headers(headers).send().await?;

        let status_code = response.status().as_u16();
        let content_type = header_string(response.headers(), &CONTENT_TYPE);
        let server = header_string(response.headers(), &SERVER);

        debug!(
            url,
            status_code,
            content_length = ?response.content_length(),
            content_type = ?content_type,
            server = ?server,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Response received"
        );

        let body = response
            .text()
            .await
            .map_err(|e| EngineError::BodyFailed(e.to_string()))?;

        Ok(FetchedPage {
            status_code,
            body,
            content_type,
            server,
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// 请求IP回显服务，返回去除空白后的响应体
    async fn exit_address(&self) -> Result<String, EngineError> {
        let response = self.client.get(&self.ip_check_url).send().await?;
        let body = response.text().await?;
        Ok(body.trim().to_string())
    }
}

fn header_string(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

#[cfg(test)]
#[path = "reqwest_engine_test.rs"]
mod tests;
