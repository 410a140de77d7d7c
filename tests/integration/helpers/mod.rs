// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use onionscan::domain::models::profile::IdentityProfile;
use onionscan::domain::repositories::storage_repository::{StorageError, StorageRepository};
use onionscan::domain::services::classifier::RuleSet;
use onionscan::domain::services::identity::ProfilePool;
use onionscan::engines::traits::{
    EngineError, FetchedPage, NetworkSession, PageFetcher, ProxyDiscovery, ProxyEndpoint,
    ScreenshotCapturer,
};
use onionscan::infrastructure::report::{ReportWriter, RunLog};
use onionscan::utils::errors::ProxyError;
use onionscan::workers::scan_worker::ScanContext;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const RULES: &str = r#"
categories:
  - id: market
    name: Marketplace
    tag: "[MARKET]"
    color: green
    priority: 1
    keywords:
      high: [escrow, vendor]
      medium: [shop, cart]
      exclude: []
    structure_rules:
      - selector: "div.listing"
    max_links: 100
  - id: forum
    name: Forum
    tag: "[FORUM]"
    color: blue
    priority: 2
    keywords:
      high: [thread, reply]
      medium: [topic]
"#;

pub const MARKET_PAGE: &str = r#"<html>
<head><title>Escrow Market</title></head>
<body>
  <div class="listing">escrow vendor</div>
  <a href="/market/vendor">Trusted vendor</a>
  <a href="http://other.onion/">Home</a>
</body>
</html>"#;

/// 桩抓取器的预设响应
#[derive(Clone)]
pub enum Behavior {
    Page { status: u16, body: String },
    Fail(String),
    BodyFail,
    Panic,
}

/// 按URL返回预设响应的抓取器，未预设的URL返回连接失败
#[derive(Default)]
pub struct StubFetcher {
    responses: HashMap<String, Behavior>,
    calls: AtomicUsize,
    profiles_seen: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, behavior: Behavior) -> Self {
        self.responses.insert(url.to_string(), behavior);
        self
    }

    pub fn page(self, url: &str, status: u16, body: &str) -> Self {
        self.with(
            url,
            Behavior::Page {
                status,
                body: body.to_string(),
            },
        )
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn profiles_seen(&self) -> Vec<String> {
        self.profiles_seen.lock().clone()
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(
        &self,
        url: &str,
        profile: &IdentityProfile,
    ) -> Result<FetchedPage, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.profiles_seen.lock().push(profile.name.clone());

        match self.responses.get(url).cloned() {
            Some(Behavior::Page { status, body }) => Ok(FetchedPage {
                status_code: status,
                body,
                content_type: Some("text/html".to_string()),
                server: None,
                response_time_ms: 1,
            }),
            Some(Behavior::Fail(msg)) => Err(EngineError::Other(msg)),
            Some(Behavior::BodyFail) => Err(EngineError::BodyFailed("stream reset".to_string())),
            Some(Behavior::Panic) => panic!("fetcher exploded on {}", url),
            None => Err(EngineError::Other(format!("connection refused: {}", url))),
        }
    }
}

/// 代理发现桩，`session` 为 None 时模拟所有候选端点不可用
pub struct StubDiscovery {
    session: Option<NetworkSession>,
    calls: AtomicUsize,
}

impl StubDiscovery {
    pub fn available(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            session: Some(NetworkSession {
                proxy: ProxyEndpoint::new("127.0.0.1", 9050),
                fetcher,
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            session: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProxyDiscovery for StubDiscovery {
    async fn locate(&self) -> Result<NetworkSession, ProxyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.session.clone().ok_or_else(|| ProxyError::Unavailable {
            attempts: 2,
            last_error: "connection refused".to_string(),
        })
    }
}

/// 截图桩
pub struct StubScreenshotter {
    fail: bool,
    calls: AtomicUsize,
}

impl StubScreenshotter {
    pub fn succeeding() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScreenshotCapturer for StubScreenshotter {
    async fn capture(&self, _url: &str, _proxy: &ProxyEndpoint) -> Result<Vec<u8>, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(EngineError::Timeout(std::time::Duration::from_secs(30)))
        } else {
            Ok(b"\x89PNG fake".to_vec())
        }
    }
}

/// 所有写入都失败的存储
pub struct FailingStorage;

#[async_trait]
impl StorageRepository for FailingStorage {
    async fn save(&self, _key: &str, _data: &[u8]) -> Result<(), StorageError> {
        Err(StorageError::Other("disk full".to_string()))
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(None)
    }
}

pub fn report_with(storage: Arc<dyn StorageRepository>, run_log: RunLog) -> Arc<ReportWriter> {
    Arc::new(ReportWriter::new(storage, Arc::new(run_log)))
}

/// 构建带固定种子的扫描上下文
pub fn context(discovery: Arc<dyn ProxyDiscovery>, report: Arc<ReportWriter>) -> ScanContext {
    let rules = RuleSet::from_yaml_str(RULES).expect("test rules parse");
    ScanContext::new(
        discovery,
        Arc::new(rules),
        Arc::new(ProfilePool::builtin()),
        report,
    )
    .with_seed(7)
}
