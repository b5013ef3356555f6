//! 应用配置
//!
//! 由宿主应用在构建核心之前一次性选定，之后以值的形式注入，
//! 核心内部不读取任何全局环境。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// 默认命名空间 (图层 id 与要素属性的前缀)
pub const DEFAULT_NAMESPACE: &str = "trailsroc";

const DEV_CANONICAL_BASE: &str = "http://localhost:4000/";
const PROD_CANONICAL_BASE: &str = "https://map.trailsroc.org/";
const DEV_STYLE_URI: &str = "mapbox://styles/mmertsock/cj4693efo04te2rp5tdx3nyub";
const PROD_STYLE_URI: &str = "mapbox://styles/trailsroc/cjby9cvr4dt3w2sqegwrb5nkl";

/// 部署环境
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

/// 没有 URL 状态时使用的默认位置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultLocation {
    pub lat: f64,
    pub lon: f64,
    pub zoom: f64,
}

impl Default for DefaultLocation {
    fn default() -> Self {
        Self {
            lat: 43.025,
            lon: -77.572,
            zoom: 14.88,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 地图服务访问令牌
    pub token: String,
    pub style_uri: String,
    /// 可分享 URL 的根地址
    pub canonical_url_base: String,
    /// 图层 id / 要素属性前缀 (不含末尾 `-`)
    pub namespace: String,
    pub default_selection: DefaultLocation,
    /// 文档标题后缀
    pub site_title: String,
    /// iOS Smart App Banner 的 app id
    pub app_store_id: Option<String>,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// 相机中心允许范围 `[[west, south], [east, north]]`
    pub max_bounds: [[f64; 2]; 2],
    /// 地图 "loaded" 信号之后等待多久才开始查询要素
    pub load_settle_ms: u64,
    /// 渲染事件的去抖静默期
    pub render_debounce_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::for_environment(Environment::Development, "")
    }
}

impl AppConfig {
    /// 按部署环境选择 URL 根地址与样式
    pub fn for_environment(env: Environment, token: &str) -> Self {
        let (base, style) = match env {
            Environment::Development => (DEV_CANONICAL_BASE, DEV_STYLE_URI),
            Environment::Production => (PROD_CANONICAL_BASE, PROD_STYLE_URI),
        };
        Self {
            token: token.to_string(),
            style_uri: style.to_string(),
            canonical_url_base: base.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            default_selection: DefaultLocation::default(),
            site_title: "#TrailsRoc Maps".to_string(),
            app_store_id: Some("906444281".to_string()),
            min_zoom: 7.0,
            max_zoom: 18.0,
            max_bounds: [[-78.9, 42.1], [-76.25, 43.53]],
            load_settle_ms: 1500,
            render_debounce_ms: 750,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("配置 JSON 格式错误")?;
        config.canonical_base()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {:?}", path))?;
        Self::from_json_str(&text).with_context(|| format!("无法解析配置文件: {:?}", path))
    }

    /// 解析可分享 URL 的根地址
    pub fn canonical_base(&self) -> Result<Url> {
        let base = Url::parse(&self.canonical_url_base)
            .with_context(|| format!("invalid canonical_url_base: {}", self.canonical_url_base))?;
        // 可分享 URL 只在根路径上被识别
        if base.path() != "/" {
            anyhow::bail!(
                "canonical_url_base must be a root URL: {}",
                self.canonical_url_base
            );
        }
        Ok(base)
    }

    /// 属于本应用的图层 id 前缀，例如 `trailsroc-`
    pub fn layer_prefix(&self) -> String {
        format!("{}-", self.namespace)
    }

    pub fn load_settle(&self) -> Duration {
        Duration::from_millis(self.load_settle_ms)
    }

    pub fn render_debounce(&self) -> Duration {
        Duration::from_millis(self.render_debounce_ms)
    }
}
