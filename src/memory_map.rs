//! 内存地图引擎
//!
//! `MapEngine` 的纯内存实现，用于测试和 CLI：
//! - DashMap 存储要素本身 (O(1) 随机访问)
//! - R-Tree 存储要素包围盒 (O(log n) 范围查询)
//! - 两阶段加载：先插入要素，再批量构建索引
//!
//! 屏幕坐标通过 Web 墨卡托投影计算，命中测试在屏幕像素空间中进行。

use crate::feature::{FeatureRef, Geometry};
use crate::map_engine::{BoxQuery, MapEngine, MarkerId};
use crate::projection::ScreenTransform;
use crate::types::{Camera, LngLat, ScreenBox, ScreenPoint};
use anyhow::{Context, Result};
use dashmap::DashMap;
use rstar::{RTree, RTreeObject, AABB};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::RwLock;

/// R-Tree 中的空间索引项 (只存 ID 和经纬度包围盒)
#[derive(Debug, Clone, Copy)]
pub struct SpatialEntry {
    pub id: u64,
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl RTreeObject for SpatialEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.min_lon, self.min_lat], [self.max_lon, self.max_lat])
    }
}

/// 相机最近一次的变化方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Jump,
    Ease,
}

/// 地图上的一个标记
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedMarker {
    pub at: LngLat,
    pub popup: Option<String>,
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<FeatureRef>,
}

pub struct MemoryMap {
    features: DashMap<u64, FeatureRef>,
    index: RwLock<RTree<SpatialEntry>>,
    index_dirty: AtomicBool,
    next_feature_id: AtomicU64,
    /// 查询次数 (按 id 查询 + 框选查询)
    query_count: AtomicUsize,
    layers: Vec<String>,
    style_loaded: bool,
    viewport: ScreenTransform,
    markers: BTreeMap<u64, PlacedMarker>,
    next_marker_id: u64,
    overlays: Vec<String>,
    last_transition: Option<Transition>,
}

impl MemoryMap {
    pub fn new(camera: Camera, width: f64, height: f64) -> Self {
        Self {
            features: DashMap::new(),
            index: RwLock::new(RTree::new()),
            index_dirty: AtomicBool::new(false),
            next_feature_id: AtomicU64::new(1),
            query_count: AtomicUsize::new(0),
            layers: Vec::new(),
            style_loaded: true,
            viewport: ScreenTransform {
                camera,
                width,
                height,
            },
            markers: BTreeMap::new(),
            next_marker_id: 1,
            overlays: Vec::new(),
            last_transition: None,
        }
    }

    /// 添加样式图层 (重复添加无效)
    pub fn add_layer(&mut self, id: &str) {
        if !self.layers.iter().any(|l| l == id) {
            self.layers.push(id.to_string());
        }
    }

    /// 插入要素 (不更新索引，需要后续调用 rebuild_indices)
    pub fn insert_feature(&self, feature: FeatureRef) -> u64 {
        let id = self.next_feature_id.fetch_add(1, Ordering::SeqCst);
        self.features.insert(id, feature);
        self.index_dirty.store(true, Ordering::Relaxed);
        id
    }

    /// 批量重建空间索引
    pub fn rebuild_indices(&self) {
        let entries: Vec<SpatialEntry> = self
            .features
            .iter()
            .filter_map(|entry| compute_bbox(*entry.key(), entry.value()))
            .collect();

        if let Ok(mut index) = self.index.write() {
            *index = RTree::bulk_load(entries);
        }

        self.index_dirty.store(false, Ordering::Relaxed);
    }

    /// 加载 GeoJSON FeatureCollection
    ///
    /// 没有 `layer` 字段的要素放入 `default_layer`。返回加载的要素数量。
    pub fn load_geojson(&mut self, json: &str, default_layer: &str) -> Result<usize> {
        let collection: FeatureCollection =
            serde_json::from_str(json).context("无法解析 GeoJSON FeatureCollection")?;
        let count = collection.features.len();

        for mut feature in collection.features {
            let layer = feature
                .layer
                .get_or_insert_with(|| default_layer.to_string())
                .clone();
            self.add_layer(&layer);
            self.insert_feature(feature);
        }

        self.rebuild_indices();
        Ok(count)
    }

    /// 清空所有要素 (模拟数据源重载)
    pub fn clear_features(&mut self) {
        self.features.clear();
        self.rebuild_indices();
    }

    pub fn set_style_loaded(&mut self, loaded: bool) {
        self.style_loaded = loaded;
    }

    pub fn project(&self, p: LngLat) -> ScreenPoint {
        self.viewport.project(p)
    }

    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::Relaxed)
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn markers(&self) -> Vec<&PlacedMarker> {
        self.markers.values().collect()
    }

    pub fn overlays(&self) -> &[String] {
        &self.overlays
    }

    pub fn last_transition(&self) -> Option<Transition> {
        self.last_transition
    }

    fn in_layers(feature: &FeatureRef, layers: &[String]) -> bool {
        feature
            .layer
            .as_ref()
            .is_some_and(|layer| layers.contains(layer))
    }

    /// 要素在屏幕上是否与查询框相交
    fn hit_test(&self, geometry: &Geometry, bbox: &ScreenBox) -> bool {
        let center = bbox.center();
        let tolerance = 0.5 * (bbox.max.x - bbox.min.x);
        let tolerance_sq = tolerance * tolerance;

        match geometry {
            Geometry::Point(p) => bbox.contains(self.project(*p)),
            Geometry::LineString(line) => {
                let projected: Vec<ScreenPoint> = line.iter().map(|p| self.project(*p)).collect();
                polyline_distance_sq(center, &projected) <= tolerance_sq
            }
            Geometry::Polygon(rings) => {
                let projected: Vec<Vec<ScreenPoint>> = rings
                    .iter()
                    .map(|ring| ring.iter().map(|p| self.project(*p)).collect())
                    .collect();
                let inside = projected
                    .first()
                    .is_some_and(|outer| point_in_ring(center, outer));
                inside
                    || projected
                        .iter()
                        .any(|ring| polyline_distance_sq(center, ring) <= tolerance_sq)
            }
            Geometry::Unsupported(_) => false,
        }
    }
}

/// 计算要素的经纬度包围盒
fn compute_bbox(id: u64, feature: &FeatureRef) -> Option<SpatialEntry> {
    let vertices = feature.geometry.as_ref()?.vertices();
    let first = vertices.first()?;

    let mut entry = SpatialEntry {
        id,
        min_lon: first.lon,
        min_lat: first.lat,
        max_lon: first.lon,
        max_lat: first.lat,
    };
    for p in &vertices[1..] {
        entry.min_lon = entry.min_lon.min(p.lon);
        entry.min_lat = entry.min_lat.min(p.lat);
        entry.max_lon = entry.max_lon.max(p.lon);
        entry.max_lat = entry.max_lat.max(p.lat);
    }
    Some(entry)
}

/// 点到线段的最短距离（平方）
fn point_to_segment_distance_sq(p: ScreenPoint, a: ScreenPoint, b: ScreenPoint) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;

    if len_sq < 1e-10 {
        // 线段退化为点
        let dx = p.x - a.x;
        let dy = p.y - a.y;
        return dx * dx + dy * dy;
    }

    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    let proj_x = a.x + t * dx;
    let proj_y = a.y + t * dy;

    let dx = p.x - proj_x;
    let dy = p.y - proj_y;
    dx * dx + dy * dy
}

/// 点到折线的最短距离（平方）
fn polyline_distance_sq(p: ScreenPoint, line: &[ScreenPoint]) -> f64 {
    match line {
        [] => f64::MAX,
        [only] => point_to_segment_distance_sq(p, *only, *only),
        _ => line
            .windows(2)
            .map(|w| point_to_segment_distance_sq(p, w[0], w[1]))
            .fold(f64::MAX, f64::min),
    }
}

/// 射线法判断点是否在环内
fn point_in_ring(p: ScreenPoint, ring: &[ScreenPoint]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

impl MapEngine for MemoryMap {
    fn style_layer_ids(&self) -> Vec<String> {
        self.layers.clone()
    }

    fn is_style_loaded(&self) -> bool {
        self.style_loaded
    }

    fn query_by_property(&self, layers: &[String], key: &str, value: &str) -> Vec<FeatureRef> {
        self.query_count.fetch_add(1, Ordering::Relaxed);

        let mut found: Vec<(u64, FeatureRef)> = self
            .features
            .iter()
            .filter(|entry| {
                let feature = entry.value();
                Self::in_layers(feature, layers)
                    && feature
                        .properties
                        .as_ref()
                        .and_then(|props| props.get(key))
                        .and_then(|v| v.as_str())
                        == Some(value)
            })
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        // 按插入顺序返回，保证结果稳定
        found.sort_by_key(|(id, _)| *id);
        found.into_iter().map(|(_, f)| f).collect()
    }

    fn query_box(&self, bbox: ScreenBox, query: BoxQuery<'_>) -> Vec<FeatureRef> {
        self.query_count.fetch_add(1, Ordering::Relaxed);

        if self.index_dirty.load(Ordering::Relaxed) {
            self.rebuild_indices();
        }

        // 屏幕左上/右下角 → 经纬度范围 (y 向下，纬度向上)
        let top_left = self.viewport.unproject(bbox.min);
        let bottom_right = self.viewport.unproject(bbox.max);
        let envelope = AABB::from_corners(
            [top_left.lon, bottom_right.lat],
            [bottom_right.lon, top_left.lat],
        );

        let index = match self.index.read() {
            Ok(guard) => guard,
            Err(_) => return vec![],
        };

        let mut ids: Vec<u64> = index
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.id)
            .collect();
        ids.sort_unstable();

        ids.into_iter()
            .filter_map(|id| self.features.get(&id).map(|f| f.clone()))
            .filter(|f| Self::in_layers(f, query.layers) && f.has_property(query.has_property))
            .filter(|f| {
                f.geometry
                    .as_ref()
                    .is_some_and(|g| self.hit_test(g, &bbox))
            })
            .collect()
    }

    fn camera(&self) -> Camera {
        self.viewport.camera
    }

    fn jump_to(&mut self, camera: Camera) {
        self.viewport.camera = camera;
        self.last_transition = Some(Transition::Jump);
    }

    fn ease_to(&mut self, camera: Camera) {
        // 内存引擎没有动画，直接到达终点
        self.viewport.camera = camera;
        self.last_transition = Some(Transition::Ease);
    }

    fn add_marker(&mut self, at: LngLat, popup: Option<&str>) -> MarkerId {
        let id = self.next_marker_id;
        self.next_marker_id += 1;
        self.markers.insert(
            id,
            PlacedMarker {
                at,
                popup: popup.map(str::to_string),
            },
        );
        MarkerId(id)
    }

    fn remove_marker(&mut self, id: MarkerId) {
        self.markers.remove(&id.0);
    }

    fn add_line_overlay(&mut self, layer_id: &str, _feature: &FeatureRef) {
        self.add_layer(layer_id);
        self.overlays.push(layer_id.to_string());
    }

    fn remove_layer(&mut self, layer_id: &str) {
        self.layers.retain(|l| l != layer_id);
        self.overlays.retain(|l| l != layer_id);
    }
}
