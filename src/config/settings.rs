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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// 应用程序配置设置
///
/// 包含代理探测、HTTP客户端、扫描、分类规则、身份配置和截图等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 代理探测配置
    pub proxy: ProxySettings,
    /// HTTP客户端配置
    pub http: HttpSettings,
    /// 扫描配置
    pub scan: ScanSettings,
    /// 分类规则配置
    pub classifier: ClassifierSettings,
    /// 身份配置
    #[serde(default)]
    pub profiles: ProfileSettings,
    /// 截图配置
    pub screenshot: ScreenshotSettings,
}

/// 代理探测配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ProxySettings {
    /// 按优先级排列的候选代理端点 (host:port)
    pub candidates: Vec<String>,
    /// 探测连接的外部检查点主机
    pub checkpoint_host: String,
    /// 探测连接的外部检查点端口
    pub checkpoint_port: u16,
    /// 单个端点的探测超时时间（秒）
    pub probe_timeout_secs: u64,
}

/// HTTP客户端配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    /// 单次请求超时时间（秒）
    pub timeout_secs: u64,
    /// 每个主机的最大空闲连接数
    pub pool_max_idle_per_host: usize,
    /// 空闲连接超时时间（秒）
    pub pool_idle_timeout_secs: u64,
    /// 出口IP查询服务
    pub ip_check_url: String,
}

/// 扫描配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ScanSettings {
    /// 并行工作器数量
    pub workers: usize,
    /// 输出目录（未设置时使用目标文件名）
    pub output_dir: Option<String>,
    /// 运行日志文件名
    pub log_file: String,
}

/// 分类规则配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierSettings {
    /// 分类规则文件路径 (YAML)
    pub rules_path: String,
}

/// 身份配置设置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileSettings {
    /// 身份配置文件路径 (JSON)，未设置时使用内置列表
    pub path: Option<String>,
}

/// 截图配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ScreenshotSettings {
    /// 是否启用截图
    pub enabled: bool,
    /// 单次截图的硬超时（秒）
    pub timeout_secs: u64,
    /// 页面加载后的等待时间（毫秒）
    pub settle_ms: u64,
    /// 窗口宽度
    pub window_width: u32,
    /// 窗口高度
    pub window_height: u32,
    /// 浏览器可执行文件路径
    pub executable: Option<String>,
    /// 远程调试地址（连接已运行的浏览器）
    pub remote_debugging_url: Option<String>,
}

impl ProxySettings {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            pool_max_idle_per_host: 10,
            pool_idle_timeout_secs: 90,
            ip_check_url: "https://api.ipify.org".to_string(),
        }
    }
}

impl ScreenshotSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次加载内置默认值、配置文件和环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("ONIONSCAN")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("proxy.candidates")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// 仅包含内置默认值的配置
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            // Proxy discovery
            .set_default(
                "proxy.candidates",
                vec!["127.0.0.1:9050".to_string(), "127.0.0.1:9150".to_string()],
            )?
            .set_default("proxy.checkpoint_host", "check.torproject.org")?
            .set_default("proxy.checkpoint_port", 80)?
            .set_default("proxy.probe_timeout_secs", 10)?
            // HTTP client
            .set_default("http.timeout_secs", 60)?
            .set_default("http.pool_max_idle_per_host", 10)?
            .set_default("http.pool_idle_timeout_secs", 90)?
            .set_default("http.ip_check_url", "https://api.ipify.org")?
            // Scan
            .set_default("scan.workers", 5)?
            .set_default("scan.log_file", "scan_result.log")?
            // Classifier
            .set_default("classifier.rules_path", "config/categories.yaml")?
            // Screenshot
            .set_default("screenshot.enabled", true)?
            .set_default("screenshot.timeout_secs", 30)?
            .set_default("screenshot.settle_ms", 2000)?
            .set_default("screenshot.window_width", 1280)?
            .set_default("screenshot.window_height", 1024)
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
