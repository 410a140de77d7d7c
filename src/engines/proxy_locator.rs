// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_socks::tcp::Socks5Stream;
use tracing::{debug, info, warn};

use crate::config::settings::{HttpSettings, ProxySettings};
use crate::engines::reqwest_engine::FetchClient;
use crate::engines::traits::{NetworkSession, ProxyDiscovery, ProxyEndpoint};
use crate::utils::errors::ProxyError;

/// 匿名代理定位器
///
/// 按顺序探测候选端点，第一个能够经由代理连通外部检查点的端点胜出
pub struct ProxyLocator {
    candidates: Vec<ProxyEndpoint>,
    checkpoint_host: String,
    checkpoint_port: u16,
    probe_timeout: Duration,
    http: HttpSettings,
}

impl ProxyLocator {
    pub fn new(
        candidates: Vec<ProxyEndpoint>,
        checkpoint_host: impl Into<String>,
        checkpoint_port: u16,
        probe_timeout: Duration,
        http: HttpSettings,
    ) -> Self {
        Self {
            candidates,
            checkpoint_host: checkpoint_host.into(),
            checkpoint_port,
            probe_timeout,
            http,
        }
    }

    /// 从配置创建定位器
    ///
    /// 候选地址格式错误时返回 `ProxyError::InvalidEndpoint`
    pub fn from_settings(proxy: &ProxySettings, http: &HttpSettings) -> Result<Self, ProxyError> {
        let candidates = proxy
            .candidates
            .iter()
            .map(|c| c.parse::<ProxyEndpoint>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(
            candidates,
            proxy.checkpoint_host.clone(),
            proxy.checkpoint_port,
            proxy.probe_timeout(),
            http.clone(),
        ))
    }

    /// 探测单个端点
    ///
    /// 经由候选端点向检查点发起 SOCKS5 CONNECT，整个过程受探测超时约束
    pub async fn probe(&self, endpoint: &ProxyEndpoint) -> Result<(), ProxyError> {
        tokio::time::timeout(self.probe_timeout, self.socks5_connect(endpoint))
            .await
            .map_err(|_| {
                ProxyError::Timeout(format!("{} after {:?}", endpoint, self.probe_timeout))
            })?
    }

    async fn socks5_connect(&self, endpoint: &ProxyEndpoint) -> Result<(), ProxyError> {
        // The checkpoint is sent as a domain so the proxy resolves it
        let stream = Socks5Stream::connect(
            (endpoint.host.as_str(), endpoint.port),
            (self.checkpoint_host.as_str(), self.checkpoint_port),
        )
        .await
        .map_err(|e| match e {
            tokio_socks::Error::Io(e) => ProxyError::Io(e),
            other => ProxyError::Handshake(other.to_string()),
        })?;

        stream.into_inner().shutdown().await?;
        Ok(())
    }
}

#[async_trait]
impl ProxyDiscovery for ProxyLocator {
    async fn locate(&self) -> Result<NetworkSession, ProxyError> {
        let mut last_error = String::from("no candidate endpoints configured");

        for endpoint in &self.candidates {
            debug!("Probing proxy endpoint {}", endpoint);
            match self.probe(endpoint).await {
                Ok(()) => {
                    let client = FetchClient::with_proxy(endpoint, &self.http)
                        .map_err(|e| ProxyError::Client(e.to_string()))?;
                    info!("Anonymizing proxy found at {}", endpoint);
                    return Ok(NetworkSession {
                        proxy: endpoint.clone(),
                        fetcher: Arc::new(client),
                    });
                }
                Err(e) => {
                    warn!("Proxy endpoint {} unavailable: {}", endpoint, e);
                    last_error = e.to_string();
                }
            }
        }

        Err(ProxyError::Unavailable {
            attempts: self.candidates.len(),
            last_error,
        })
    }
}
