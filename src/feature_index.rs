//! 要素索引
//!
//! 职责：
//! - 记录属于本应用命名空间的图层 (每次样式加载时构建一次)
//! - 按实体 id 精确查找要素 (带会话内缓存)
//! - 按屏幕坐标模糊查找要素 (不缓存，结果随视口变化)

use crate::feature::{FeatureRef, PropertyKeys};
use crate::map_engine::{BoxQuery, MapEngine};
use crate::types::{ScreenBox, ScreenPoint};
use std::collections::HashMap;
use tracing::debug;

/// 点击查询框的半宽（像素）
pub const NEAR_QUERY_HALF_WIDTH: f64 = 5.0;

#[derive(Debug)]
pub struct FeatureIndex {
    layer_ids: Vec<String>,
    keys: PropertyKeys,
    cache: HashMap<String, FeatureRef>,
}

impl FeatureIndex {
    /// 从当前样式中筛选出 id 以 `layer_prefix` 开头的图层
    pub fn new<M: MapEngine + ?Sized>(map: &M, layer_prefix: &str, keys: PropertyKeys) -> Self {
        let layer_ids: Vec<String> = map
            .style_layer_ids()
            .into_iter()
            .filter(|id| id.starts_with(layer_prefix))
            .collect();
        debug!(layers = layer_ids.len(), "feature index built");

        Self {
            layer_ids,
            keys,
            cache: HashMap::new(),
        }
    }

    pub fn layer_ids(&self) -> &[String] {
        &self.layer_ids
    }

    pub fn keys(&self) -> &PropertyKeys {
        &self.keys
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// 按实体 id 查找
    ///
    /// 只有恰好一个要素匹配时才算找到；0 个或多个都视为未找到，
    /// 这一层不做消歧。命中结果写入缓存。
    pub fn lookup_by_id<M: MapEngine + ?Sized>(
        &mut self,
        map: &M,
        id: &str,
    ) -> Option<FeatureRef> {
        if let Some(cached) = self.cache.get(id) {
            debug!(%id, "found cached feature");
            return Some(cached.clone());
        }

        let mut found = map.query_by_property(&self.layer_ids, &self.keys.id, id);
        if found.len() != 1 {
            debug!(%id, matches = found.len(), "feature lookup miss");
            return None;
        }

        let feature = found.remove(0);
        self.cache.insert(id.to_string(), feature.clone());
        Some(feature)
    }

    /// 点击位置附近的所有候选要素 (可能为空)
    pub fn lookup_near<M: MapEngine + ?Sized>(
        &self,
        map: &M,
        point: ScreenPoint,
    ) -> Vec<FeatureRef> {
        let bbox = ScreenBox::around(point, NEAR_QUERY_HALF_WIDTH);
        map.query_box(
            bbox,
            BoxQuery {
                layers: &self.layer_ids,
                has_property: &self.keys.id,
            },
        )
    }

    /// 清空 id 缓存 (数据源重载后缓存的要素可能已过期)
    pub fn invalidate(&mut self) {
        if !self.cache.is_empty() {
            debug!(entries = self.cache.len(), "feature cache invalidated");
        }
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_map::fixtures::*;
    use crate::memory_map::MemoryMap;

    fn index_for(map: &MemoryMap) -> FeatureIndex {
        FeatureIndex::new(map, "trailsroc-", PropertyKeys::new(NS))
    }

    #[test]
    fn test_layers_filtered_by_prefix() {
        let mut map = map_at(-77.57, 43.02, 14.0);
        map.add_layer("background");
        map.add_layer("road-labels");
        let index = index_for(&map);
        assert_eq!(index.layer_ids().len(), 4);
        assert!(index.layer_ids().iter().all(|l| l.starts_with("trailsroc-")));
    }

    #[test]
    fn test_lookup_by_id_single_match_is_cached() {
        let map = with_features(
            map_at(-77.57, 43.02, 14.0),
            vec![park("park1", "Durand", -77.57, 43.02, 0.01)],
        );
        let mut index = index_for(&map);

        let first = index.lookup_by_id(&map, "park1").unwrap();
        assert_eq!(map.query_count(), 1);
        assert_eq!(index.cached_len(), 1);

        let second = index.lookup_by_id(&map, "park1").unwrap();
        assert_eq!(map.query_count(), 1, "cache hit must not query the map");
        assert_eq!(first, second);
    }

    #[test]
    fn test_lookup_by_id_zero_or_many_is_not_found() {
        let map = with_features(
            map_at(-77.57, 43.02, 14.0),
            vec![
                // 同一 id 在两个瓦片中各渲染一次
                trail("t1", Some("A"), vec![ll(-77.57, 43.02), ll(-77.56, 43.03)]),
                trail("t1", Some("A"), vec![ll(-77.56, 43.03), ll(-77.55, 43.04)]),
            ],
        );
        let mut index = index_for(&map);

        assert_eq!(index.lookup_by_id(&map, "t1"), None);
        assert_eq!(index.lookup_by_id(&map, "missing"), None);
        assert_eq!(index.cached_len(), 0);

        // 未命中不缓存，每次都重新查询
        assert_eq!(index.lookup_by_id(&map, "t1"), None);
        assert_eq!(map.query_count(), 3);
    }

    #[test]
    fn test_lookup_by_id_ignores_foreign_layers() {
        let mut foreign = park("park1", "Durand", -77.57, 43.02, 0.01);
        foreign.layer = Some("basemap-parks".to_string());
        let map = with_features(
            map_at(-77.57, 43.02, 14.0),
            vec![foreign, park("park1", "Durand", -77.57, 43.02, 0.01)],
        );
        let mut index = index_for(&map);
        let found = index.lookup_by_id(&map, "park1").unwrap();
        assert_eq!(found.layer.as_deref(), Some(PARKS));
    }

    #[test]
    fn test_invalidate_forces_requery() {
        let map = with_features(
            map_at(-77.57, 43.02, 14.0),
            vec![park("park1", "Durand", -77.57, 43.02, 0.01)],
        );
        let mut index = index_for(&map);
        index.lookup_by_id(&map, "park1");
        index.invalidate();
        assert_eq!(index.cached_len(), 0);
        index.lookup_by_id(&map, "park1");
        assert_eq!(map.query_count(), 2);
    }

    #[test]
    fn test_lookup_near_is_not_cached() {
        let map = with_features(
            map_at(-77.57, 43.02, 15.0),
            vec![point("p1", "parking", "Lot", ll(-77.57, 43.02))],
        );
        let index = index_for(&map);
        let at = map.project(ll(-77.57, 43.02));
        assert_eq!(index.lookup_near(&map, at).len(), 1);
        assert_eq!(index.lookup_near(&map, at).len(), 1);
        assert_eq!(map.query_count(), 2);

        // 远离要素的点击
        let far = map.project(ll(-77.5, 43.06));
        assert!(index.lookup_near(&map, far).is_empty());
    }
}
