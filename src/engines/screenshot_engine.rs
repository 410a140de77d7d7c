// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::ScreenshotSettings;
use crate::engines::traits::{EngineError, ProxyEndpoint, ScreenshotCapturer};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

/// 关闭页面和浏览器的宽限时间，不计入截图超时
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// 浏览器截图引擎
///
/// 基于chromiumoxide实现，每次截图启动一个独立的无头浏览器并经由匿名代理访问页面
pub struct BrowserScreenshotter {
    settings: ScreenshotSettings,
}

impl BrowserScreenshotter {
    pub fn new(settings: ScreenshotSettings) -> Self {
        Self { settings }
    }

    /// 浏览器启动参数
    ///
    /// 代理设置之外附带 WebRTC 和 DNS 泄漏防护
    pub fn launch_args(&self, proxy: &ProxyEndpoint) -> Vec<String> {
        vec![
            format!("--proxy-server=socks5://{}", proxy),
            "--host-resolver-rules=MAP * ~NOTFOUND , EXCLUDE localhost".to_string(),
            "--force-webrtc-ip-handling-policy=disable_non_proxied_udp".to_string(),
            "--webrtc-ip-handling-policy=disable_non_proxied_udp".to_string(),
            "--disable-features=WebRtcHideLocalIpsWithMdns".to_string(),
            "--disable-gpu".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--ignore-certificate-errors".to_string(),
        ]
    }

    fn browser_config(&self, proxy: &ProxyEndpoint) -> Result<BrowserConfig, EngineError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(self.settings.window_width, self.settings.window_height)
            .request_timeout(self.settings.timeout());

        if let Some(ref executable) = self.settings.executable {
            builder = builder.chrome_executable(executable);
        }
        for arg in self.launch_args(proxy) {
            builder = builder.arg(arg);
        }

        builder.build().map_err(EngineError::Browser)
    }

    /// 启动本地浏览器或连接远程浏览器，返回浏览器实例及是否由本次调用启动
    async fn open_browser(
        &self,
        proxy: &ProxyEndpoint,
    ) -> Result<(Browser, chromiumoxide::Handler, bool), EngineError> {
        if let Some(ref url) = self.settings.remote_debugging_url {
            debug!("Connecting to remote browser at {}", url);
            let (browser, handler) = Browser::connect(url)
                .await
                .map_err(|e| EngineError::Browser(format!("Failed to connect: {}", e)))?;
            return Ok((browser, handler, false));
        }

        let (browser, handler) = Browser::launch(self.browser_config(proxy)?)
            .await
            .map_err(|e| EngineError::Browser(format!("Failed to launch: {}", e)))?;
        Ok((browser, handler, true))
    }

    async fn render(&self, page: &Page, url: &str) -> Result<Vec<u8>, EngineError> {
        page.goto(url)
            .await
            .map_err(|e| EngineError::Browser(format!("Navigation failed: {}", e)))?;

        if self.settings.settle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.settings.settle_ms)).await;
        }

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();

        page.screenshot(params)
            .await
            .map_err(|e| EngineError::Browser(format!("Page screenshot failed: {}", e)))
    }

    /// 打开页面并截图，页面在任何结果下都会关闭
    async fn render_in_new_page(
        &self,
        browser: &Browser,
        url: &str,
        deadline: Instant,
    ) -> Result<Vec<u8>, EngineError> {
        let limit = self.settings.timeout();
        let page = timeout_at(deadline, browser.new_page("about:blank"))
            .await
            .map_err(|_| EngineError::Timeout(limit))?
            .map_err(|e| EngineError::Browser(e.to_string()))?;

        let result = timeout_at(deadline, self.render(&page, url))
            .await
            .unwrap_or(Err(EngineError::Timeout(limit)));

        match timeout(CLOSE_GRACE, page.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Failed to close page: {}", e),
            Err(_) => warn!("Timed out closing page for {}", url),
        }
        result
    }
}

/// 关闭由本次截图启动的浏览器，超过宽限时间则强制结束进程
async fn shutdown_browser(browser: &mut Browser) {
    let closed = timeout(CLOSE_GRACE, async {
        if let Err(e) = browser.close().await {
            debug!("Failed to close browser: {}", e);
        }
        if let Err(e) = browser.wait().await {
            debug!("Failed to reap browser process: {}", e);
        }
    })
    .await;

    if closed.is_err() {
        warn!("Browser did not exit within {:?}, killing it", CLOSE_GRACE);
        if let Some(Err(e)) = browser.kill().await {
            debug!("Failed to kill browser process: {}", e);
        }
    }
}

#[async_trait]
impl ScreenshotCapturer for BrowserScreenshotter {
    async fn capture(&self, url: &str, proxy: &ProxyEndpoint) -> Result<Vec<u8>, EngineError> {
        let limit = self.settings.timeout();
        // Launch, navigation and capture share one deadline.
        let deadline = Instant::now() + limit;

        let (mut browser, mut handler, launched) = timeout_at(deadline, self.open_browser(proxy))
            .await
            .map_err(|_| EngineError::Timeout(limit))??;

        // Spawn a handler to process browser events
        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let result = self.render_in_new_page(&browser, url, deadline).await;

        if launched {
            shutdown_browser(&mut browser).await;
        }
        handler_task.abort();

        if let Ok(ref bytes) = result {
            info!(url, size = bytes.len(), "Screenshot captured");
        }
        result
    }
}
