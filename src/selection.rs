//! 地图选择 (Selection)
//!
//! 表示世界中的一个关注点：坐标、缩放级别、可选的实体 id 与标题。
//! 可以从可分享 URL、解析出的地图要素、当前视口或默认配置构造，
//! 并派生出相机、可分享 URL、历史记录状态和外部导航 App 链接。

use crate::config::AppConfig;
use crate::feature::{FeatureKind, FeatureRef, PropertyKeys};
use crate::map_engine::MapEngine;
use crate::types::{Camera, HistoryState, LngLat};
use serde::Serialize;
use url::{form_urlencoded, Url};

/// URL 中缺少或无法解析 zoom 时使用的缩放级别
pub const DEFAULT_URL_ZOOM: f64 = 13.0;

/// 外部导航 App 的深链接地址
pub const EXTERNAL_MAP_APP_BASE: &str = "https://maps.apple.com/";

/// 短链接路径前缀
const SHORT_LINK_PREFIX: &str = "/m/";

/// 可分享 URL 解析失败的原因
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UrlStateError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("short links are not supported yet: {0}")]
    ShortLinkUnsupported(String),

    #[error("unsupported path: {0}")]
    UnsupportedPath(String),

    #[error("lat and lon are both required")]
    MissingCoordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub lat: f64,
    pub lon: f64,
    /// 缺省时在显示前由地图当前缩放级别填充
    pub zoom: Option<f64>,
    /// 逻辑实体 id (从不指向 parkBorder 这类渲染产物)
    #[serde(rename = "itemID")]
    pub entity_id: Option<String>,
    pub title: Option<String>,
    /// 构造时绑定的要素，仅用于高亮，不参与持久化
    #[serde(skip)]
    pub bound_feature: Option<FeatureRef>,
}

/// 解析有限浮点数
fn parse_finite(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 非零的有限值 (`0` 与缺失同等对待)
fn truthy(value: f64) -> Option<f64> {
    (value != 0.0 && value.is_finite()).then_some(value)
}

impl Selection {
    pub fn new(coords: LngLat, zoom: Option<f64>) -> Self {
        Self {
            lat: coords.lat,
            lon: coords.lon,
            zoom,
            entity_id: None,
            title: None,
            bound_feature: None,
        }
    }

    /// 没有 URL 状态和历史记录时的默认位置
    pub fn default_location(config: &AppConfig) -> Self {
        let d = &config.default_selection;
        Self::new(LngLat::new(d.lon, d.lat), Some(d.zoom))
    }

    /// 解析可分享 URL，返回具体的失败原因
    ///
    /// 只接受根路径 `/`：`lat` 与 `lon` 必须同时解析成功；
    /// `zoom` 独立解析，缺省为 13；`itemID` 非空时原样保留。
    /// `/m/...` 短链接可以识别但尚未实现。
    pub fn parse_shareable_url(url: &str) -> Result<Self, UrlStateError> {
        let url = Url::parse(url).map_err(|e| UrlStateError::InvalidUrl(e.to_string()))?;

        let path = url.path();
        if path.starts_with(SHORT_LINK_PREFIX) {
            return Err(UrlStateError::ShortLinkUnsupported(path.to_string()));
        }
        if path != "/" {
            return Err(UrlStateError::UnsupportedPath(path.to_string()));
        }

        let mut lat = None;
        let mut lon = None;
        let mut zoom = None;
        let mut item_id = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "lat" => lat = parse_finite(&value),
                "lon" => lon = parse_finite(&value),
                "zoom" => zoom = parse_finite(&value),
                "itemID" if !value.is_empty() => item_id = Some(value.into_owned()),
                _ => {}
            }
        }

        let (Some(lat), Some(lon)) = (lat, lon) else {
            return Err(UrlStateError::MissingCoordinates);
        };

        let zoom = zoom.unwrap_or(DEFAULT_URL_ZOOM);
        let mut selection = Self::new(LngLat::new(lon, lat), Some(zoom));
        selection.entity_id = item_id;
        Ok(selection)
    }

    /// 从可分享 URL 构造；任何失败都视为 "没有选择"
    pub fn from_shareable_url(url: &str) -> Option<Self> {
        match Self::parse_shareable_url(url) {
            Ok(selection) => Some(selection),
            Err(e) => {
                tracing::debug!(%url, error = %e, "no selection in URL");
                None
            }
        }
    }

    /// 从解析出的地图要素构造
    ///
    /// parkBorder 不是独立实体：其 `entity_id` 取 `parkID`，而不是自身 id。
    pub fn from_feature(feature: &FeatureRef, keys: &PropertyKeys) -> Option<Self> {
        let center = feature.center()?;
        feature.properties.as_ref()?;

        let entity_id = match feature.kind(keys) {
            FeatureKind::ParkBorder => feature.park_id(keys),
            _ => feature.id(keys),
        };

        Some(Self {
            lat: center.lat,
            lon: center.lon,
            zoom: None,
            entity_id: entity_id.map(str::to_string),
            title: feature.name(keys).map(str::to_string),
            bound_feature: Some(feature.clone()),
        })
    }

    /// 当前可见视口 (中心 + 缩放级别)，不带实体
    pub fn for_visible_viewport<M: MapEngine + ?Sized>(map: &M) -> Self {
        let camera = map.camera();
        Self::new(camera.center, Some(camera.zoom))
    }

    pub fn coords(&self) -> LngLat {
        LngLat::new(self.lon, self.lat)
    }

    /// lat、lon、zoom 都存在且非零时才有相机
    pub fn camera(&self) -> Option<Camera> {
        let lat = truthy(self.lat)?;
        let lon = truthy(self.lon)?;
        let zoom = truthy(self.zoom?)?;
        Some(Camera {
            center: LngLat::new(lon, lat),
            zoom,
        })
    }

    /// 规范的可分享 URL：lat/lon 保留 4 位小数，zoom 保留 1 位
    pub fn shareable_url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("lat", &format!("{:.4}", self.lat));
            query.append_pair("lon", &format!("{:.4}", self.lon));
            if let Some(zoom) = self.zoom.and_then(truthy) {
                query.append_pair("zoom", &format!("{:.1}", zoom));
            }
            if let Some(id) = self.entity_id.as_deref().filter(|id| !id.is_empty()) {
                query.append_pair("itemID", id);
            }
        }
        url
    }

    /// 外部导航 App 深链接：`ll` 与 `daddr` 都是 `"lat,lon"`
    pub fn external_map_app_url(&self) -> String {
        let ll = format!("{},{}", self.lat, self.lon);
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("ll", &ll);
        query.append_pair("daddr", &ll);
        if let Some(zoom) = self.zoom.and_then(truthy) {
            query.append_pair("z", &format!("{:.1}", zoom));
        }
        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            query.append_pair("q", title);
        }
        format!("{EXTERNAL_MAP_APP_BASE}?{}", query.finish())
    }

    /// 历史记录状态：只包含存在且非空的字段
    pub fn persistable_state(&self) -> HistoryState {
        HistoryState {
            lat: truthy(self.lat),
            lon: truthy(self.lon),
            zoom: self.zoom.and_then(truthy),
            item_id: self.entity_id.clone().filter(|s| !s.is_empty()),
            title: self.title.clone().filter(|s| !s.is_empty()),
        }
    }

    /// 用地图当前视口更新 zoom/lat/lon，不改动实体与标题
    pub fn sync_to_viewport<M: MapEngine + ?Sized>(&mut self, map: &M) {
        let camera = map.camera();
        self.zoom = Some(camera.zoom);
        self.lat = camera.center.lat;
        self.lon = camera.center.lon;
    }
}
