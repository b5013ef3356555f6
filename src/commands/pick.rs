//! 点击拾取命令
//!
//! 加载 GeoJSON 要素，在指定视口下模拟一次点击，输出候选排名和最终选择

use crate::config::AppConfig;
use crate::feature::PropertyKeys;
use crate::feature_index::FeatureIndex;
use crate::map_engine::MapEngine;
use crate::memory_map::MemoryMap;
use crate::scorer;
use crate::selection::Selection;
use crate::types::{Camera, LngLat};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// 排名后的候选 (调试输出)
#[derive(Debug, Serialize)]
pub struct RankedCandidate {
    pub id: Option<String>,
    pub kind: Option<String>,
    pub score: i32,
    pub is_indirect: bool,
}

#[derive(Debug, Serialize)]
pub struct PickReport {
    pub hits: usize,
    pub candidates: Vec<RankedCandidate>,
    pub selection: Option<Selection>,
    pub shareable_url: Option<String>,
}

/// 从 GeoJSON 文件构建内存地图
pub fn load_map(
    config: &AppConfig,
    geojson: &Path,
    camera: Camera,
    width: f64,
    height: f64,
) -> Result<MemoryMap> {
    let json = std::fs::read_to_string(geojson)
        .with_context(|| format!("无法读取 GeoJSON 文件: {:?}", geojson))?;
    let mut map = MemoryMap::new(camera, width, height);
    let default_layer = format!("{}features", config.layer_prefix());
    let count = map
        .load_geojson(&json, &default_layer)
        .with_context(|| format!("无法加载 GeoJSON 文件: {:?}", geojson))?;
    info!(features = count, "map features loaded");
    Ok(map)
}

/// 在地理坐标 `tap` 处模拟一次点击
pub fn pick_feature(config: &AppConfig, map: &MemoryMap, tap: LngLat) -> Result<PickReport> {
    let keys = PropertyKeys::new(&config.namespace);
    let mut index = FeatureIndex::new(map, &config.layer_prefix(), keys.clone());

    let point = map.project(tap);
    let hits = index.lookup_near(map, point);
    let hit_count = hits.len();
    let ranked = scorer::rank(hits, &mut index, map);

    let candidates = ranked
        .iter()
        .map(|c| RankedCandidate {
            id: c.feature.id(&keys).map(str::to_string),
            kind: c.feature.str_property(&keys.kind).map(str::to_string),
            score: c.score,
            is_indirect: c.is_indirect,
        })
        .collect();

    let selection = ranked
        .first()
        .and_then(|c| Selection::from_feature(&c.feature, &keys))
        .map(|mut s| {
            s.zoom.get_or_insert(map.camera().zoom);
            s
        });
    let shareable_url = match &selection {
        Some(s) => Some(s.shareable_url(&config.canonical_base()?).to_string()),
        None => None,
    };

    Ok(PickReport {
        hits: hit_count,
        candidates,
        selection,
        shareable_url,
    })
}
