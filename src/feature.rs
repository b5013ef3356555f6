//! 渲染要素 (FeatureRef) 与领域类型
//!
//! 地图引擎渲染出的矢量要素对核心来说是不透明数据：
//! 核心只读取几何体和带命名空间前缀的属性 (`trailsroc-type` 等)。
//!
//! 领域类型：
//! - `park`: 公园面
//! - `parkBorder`: 公园边界线，本身不是实体，通过 `parkID` 指向所属公园
//! - `trailSegment`: 步道段
//! - `point-<kind>`: 兴趣点 (停车场、厕所、观景点……)

use crate::types::LngLat;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 常见设施类兴趣点 (评分时优先于其它兴趣点)
pub const COMMON_POINT_KINDS: [&str; 6] =
    ["lodge", "parking", "poi", "restroom", "scenic", "shelter"];

// ============================================================================
// 几何体
// ============================================================================

/// 要素几何体 (GeoJSON 子集)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawGeometry", into = "RawGeometry")]
pub enum Geometry {
    Point(LngLat),
    LineString(Vec<LngLat>),
    /// 第一个环是外环
    Polygon(Vec<Vec<LngLat>>),
    /// 其它几何类型 (MultiPolygon 等) 或坐标无法解析
    Unsupported(String),
}

impl Geometry {
    pub fn type_name(&self) -> &str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::Unsupported(kind) => kind,
        }
    }

    /// 几何体的所有顶点
    pub fn vertices(&self) -> Vec<LngLat> {
        match self {
            Geometry::Point(p) => vec![*p],
            Geometry::LineString(line) => line.clone(),
            Geometry::Polygon(rings) => rings.iter().flatten().copied().collect(),
            Geometry::Unsupported(_) => Vec::new(),
        }
    }
}

/// GeoJSON 线上格式
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

fn parse_position(value: &Value) -> Option<LngLat> {
    let arr = value.as_array()?;
    if arr.len() < 2 {
        return None;
    }
    Some(LngLat::new(arr[0].as_f64()?, arr[1].as_f64()?))
}

fn parse_line(value: &Value) -> Option<Vec<LngLat>> {
    value.as_array()?.iter().map(parse_position).collect()
}

fn parse_rings(value: &Value) -> Option<Vec<Vec<LngLat>>> {
    value.as_array()?.iter().map(parse_line).collect()
}

fn line_value(line: &[LngLat]) -> Value {
    Value::Array(line.iter().map(|p| serde_json::json!([p.lon, p.lat])).collect())
}

impl From<RawGeometry> for Geometry {
    fn from(raw: RawGeometry) -> Self {
        let parsed = match raw.kind.as_str() {
            "Point" => parse_position(&raw.coordinates).map(Geometry::Point),
            "LineString" => parse_line(&raw.coordinates).map(Geometry::LineString),
            "Polygon" => parse_rings(&raw.coordinates).map(Geometry::Polygon),
            _ => None,
        };
        parsed.unwrap_or(Geometry::Unsupported(raw.kind))
    }
}

impl From<Geometry> for RawGeometry {
    fn from(geometry: Geometry) -> Self {
        let coordinates = match &geometry {
            Geometry::Point(p) => serde_json::json!([p.lon, p.lat]),
            Geometry::LineString(line) => line_value(line),
            Geometry::Polygon(rings) => Value::Array(rings.iter().map(|r| line_value(r)).collect()),
            Geometry::Unsupported(_) => Value::Null,
        };
        RawGeometry {
            kind: geometry.type_name().to_string(),
            coordinates,
        }
    }
}

// ============================================================================
// 中心点策略
// ============================================================================

/// 顶点集合包围盒的中点 (空集合返回 None)
pub fn bbox_center(points: &[LngLat]) -> Option<LngLat> {
    let first = points.first()?;
    let (mut min_lon, mut max_lon) = (first.lon, first.lon);
    let (mut min_lat, mut max_lat) = (first.lat, first.lat);
    for p in &points[1..] {
        min_lon = min_lon.min(p.lon);
        max_lon = max_lon.max(p.lon);
        min_lat = min_lat.min(p.lat);
        max_lat = max_lat.max(p.lat);
    }
    Some(LngLat::new(
        0.5 * (min_lon + max_lon),
        0.5 * (min_lat + max_lat),
    ))
}

/// 要素中心点
///
/// - Point: 坐标本身
/// - Polygon: 外环包围盒中点 (不是面积质心)
/// - LineString: 所有顶点包围盒中点
/// - 其它: None
pub fn center(geometry: &Geometry) -> Option<LngLat> {
    match geometry {
        Geometry::Point(p) => Some(*p),
        Geometry::Polygon(rings) => bbox_center(rings.first()?),
        Geometry::LineString(line) => bbox_center(line),
        Geometry::Unsupported(_) => None,
    }
}

// ============================================================================
// 属性键与领域类型
// ============================================================================

/// 带命名空间前缀的属性键
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyKeys {
    pub kind: String,
    pub id: String,
    pub park_id: String,
    pub name: String,
    pub short_name: String,
}

impl PropertyKeys {
    pub fn new(namespace: &str) -> Self {
        Self {
            kind: format!("{namespace}-type"),
            id: format!("{namespace}-id"),
            park_id: format!("{namespace}-parkID"),
            name: format!("{namespace}-name"),
            short_name: format!("{namespace}-shortName"),
        }
    }
}

/// 领域类型 (从 `<ns>-type` 属性解析)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind<'a> {
    Park,
    ParkBorder,
    TrailSegment,
    /// `point-<kind>`，携带 `<kind>` 部分
    Point(&'a str),
    Other(&'a str),
    /// 缺少类型属性
    Unknown,
}

impl<'a> FeatureKind<'a> {
    pub fn parse(value: Option<&'a str>) -> Self {
        match value {
            None => FeatureKind::Unknown,
            Some("park") => FeatureKind::Park,
            Some("parkBorder") => FeatureKind::ParkBorder,
            Some("trailSegment") => FeatureKind::TrailSegment,
            Some(t) => match t.strip_prefix("point-") {
                Some(kind) => FeatureKind::Point(kind),
                None => FeatureKind::Other(t),
            },
        }
    }

    pub fn is_common_point(&self) -> bool {
        match self {
            FeatureKind::Point(kind) => COMMON_POINT_KINDS.iter().any(|k| k == kind),
            _ => false,
        }
    }
}

/// 地图引擎渲染出的一个矢量要素
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureRef {
    #[serde(default)]
    pub geometry: Option<Geometry>,
    /// 要素所在的样式图层
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

impl FeatureRef {
    pub fn new(geometry: Geometry, layer: &str, properties: Map<String, Value>) -> Self {
        Self {
            geometry: Some(geometry),
            layer: Some(layer.to_string()),
            properties: Some(properties),
        }
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties
            .as_ref()
            .is_some_and(|props| props.contains_key(key))
    }

    /// 字符串属性 (空字符串视为缺失)
    pub fn str_property(&self, key: &str) -> Option<&str> {
        self.properties
            .as_ref()?
            .get(key)?
            .as_str()
            .filter(|s| !s.is_empty())
    }

    pub fn kind(&self, keys: &PropertyKeys) -> FeatureKind<'_> {
        FeatureKind::parse(self.str_property(&keys.kind))
    }

    pub fn id(&self, keys: &PropertyKeys) -> Option<&str> {
        self.str_property(&keys.id)
    }

    pub fn park_id(&self, keys: &PropertyKeys) -> Option<&str> {
        self.str_property(&keys.park_id)
    }

    pub fn name(&self, keys: &PropertyKeys) -> Option<&str> {
        self.str_property(&keys.name)
    }

    pub fn short_name(&self, keys: &PropertyKeys) -> Option<&str> {
        self.str_property(&keys.short_name)
    }

    pub fn center(&self) -> Option<LngLat> {
        center(self.geometry.as_ref()?)
    }

    pub fn is_line(&self) -> bool {
        matches!(self.geometry, Some(Geometry::LineString(_)))
    }
}
