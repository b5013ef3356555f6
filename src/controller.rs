//! 选择控制器
//!
//! 状态机：`Uninitialized → StyleLoading → Ready`
//!
//! - 地图 "loaded" 信号之后等待固定的握手延迟，再检查样式是否就绪
//! - 只有 `Ready` 状态才处理点击和渲染去抖
//! - 每次渲染事件重置同一个去抖计时器 (后到者覆盖)，静默期结束后才持久化
//!
//! 控制器本身不持有任何计时器，只记录截止时间；
//! 宿主通过 `next_deadline` / `poll_timers` 驱动 (见 `event_loop`)。

use crate::config::AppConfig;
use crate::feature::PropertyKeys;
use crate::feature_index::FeatureIndex;
use crate::map_engine::{MapEngine, MapEvent, MarkerId};
use crate::page::{
    app_banner_content, document_title, set_class_presence, PageHost, APP_BANNER_META,
};
use crate::scorer;
use crate::selection::Selection;
use crate::types::{Camera, LngLat, ScreenPoint};
use anyhow::Result;
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// 高亮线图层 id 前缀 (不带命名空间前缀，不会被要素索引收录)
const HIGHLIGHT_LAYER_PREFIX: &str = "selection-highlight-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Uninitialized,
    StyleLoading,
    Ready,
}

/// 显示选择时的相机行为
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShowOptions {
    pub update_camera: bool,
    pub animated: bool,
}

/// 当前挂在地图上的高亮产物
#[derive(Debug, Clone, PartialEq)]
enum Highlight {
    Marker(MarkerId),
    Overlay(String),
}

pub struct SelectionController<M: MapEngine, P: PageHost> {
    config: AppConfig,
    base: Url,
    keys: PropertyKeys,
    map: M,
    page: P,
    state: ControllerState,
    index: Option<FeatureIndex>,
    selection: Selection,
    /// URL 中带的实体 id，握手完成后解析一次
    pending_entity: Option<String>,
    highlights: Vec<Highlight>,
    next_overlay_seq: u64,
    load_deadline: Option<Instant>,
    /// 握手等待期间又收到 loaded 信号：首次检查失败时按它重新检查
    retry_deadline: Option<Instant>,
    render_deadline: Option<Instant>,
}

impl<M: MapEngine, P: PageHost> SelectionController<M, P> {
    /// 创建控制器
    ///
    /// 初始位置取 URL 中的选择，否则取配置的默认位置；
    /// 相机直接跳转过去并立即持久化一次。
    pub fn new(config: AppConfig, mut map: M, page: P, initial_url: Option<&str>) -> Result<Self> {
        let base = config.canonical_base()?;
        let keys = PropertyKeys::new(&config.namespace);

        let from_url = initial_url.and_then(Selection::from_shareable_url);
        let pending_entity = from_url.as_ref().and_then(|s| s.entity_id.clone());
        let initial = from_url.unwrap_or_else(|| Selection::default_location(&config));

        if let Some(camera) = initial.camera() {
            map.jump_to(constrain_camera(&config, camera));
        }

        let mut controller = Self {
            config,
            base,
            keys,
            map,
            page,
            state: ControllerState::Uninitialized,
            index: None,
            selection: initial,
            pending_entity,
            highlights: Vec::new(),
            next_overlay_seq: 1,
            load_deadline: None,
            retry_deadline: None,
            render_deadline: None,
        };
        controller.persist();
        Ok(controller)
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn index(&self) -> Option<&FeatureIndex> {
        self.index.as_ref()
    }

    /// 最近的待触发截止时间
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.load_deadline, self.render_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// 处理一个地图事件 (先触发已到期的计时器)
    pub fn handle_event(&mut self, event: MapEvent, now: Instant) {
        self.poll_timers(now);

        match event {
            MapEvent::Loaded => match self.state {
                ControllerState::Uninitialized => {
                    self.state = ControllerState::StyleLoading;
                    self.load_deadline = Some(now + self.config.load_settle());
                    info!(settle_ms = self.config.load_settle_ms, "map loaded, waiting to settle");
                }
                ControllerState::StyleLoading => {
                    self.retry_deadline = Some(now + self.config.load_settle());
                    debug!("duplicate loaded signal, kept as retry");
                }
                ControllerState::Ready => debug!("loaded signal ignored after ready"),
            },
            MapEvent::StyleLoaded => {
                if self.state == ControllerState::Ready {
                    // 样式或数据源重载：图层列表和缓存都可能过期
                    self.rebuild_index();
                } else {
                    debug!(state = ?self.state, "style loaded before handshake, ignored");
                }
            }
            MapEvent::Click(point) => {
                if self.state == ControllerState::Ready {
                    self.handle_tap(point);
                } else {
                    debug!(state = ?self.state, "tap ignored before ready");
                }
            }
            MapEvent::Render => {
                if self.state == ControllerState::Ready {
                    self.render_deadline = Some(now + self.config.render_debounce());
                }
            }
        }
    }

    /// 触发所有已到期的计时器
    pub fn poll_timers(&mut self, now: Instant) {
        if self.load_deadline.is_some_and(|d| now >= d) {
            self.load_deadline = None;
            self.complete_handshake();
        }
        if self.render_deadline.is_some_and(|d| now >= d) {
            self.render_deadline = None;
            self.render_settled();
        }
    }

    fn complete_handshake(&mut self) {
        if self.state != ControllerState::StyleLoading {
            return;
        }
        if !self.map.is_style_loaded() {
            match self.retry_deadline.take() {
                Some(retry) => {
                    warn!("style not ready after settle delay, retrying");
                    self.load_deadline = Some(retry);
                }
                None => {
                    warn!("style not ready after settle delay, waiting for next loaded signal");
                    self.state = ControllerState::Uninitialized;
                }
            }
            return;
        }

        self.retry_deadline = None;
        self.rebuild_index();
        self.state = ControllerState::Ready;
        info!("selection controller ready");

        if let Some(entity_id) = self.pending_entity.take() {
            self.show_entity(&entity_id);
        }
    }

    fn rebuild_index(&mut self) {
        let index = FeatureIndex::new(&self.map, &self.config.layer_prefix(), self.keys.clone());
        info!(layers = index.layer_ids().len(), "feature index rebuilt");
        self.index = Some(index);
    }

    /// 按 id 解析初始实体，原地显示 (不移动相机)
    fn show_entity(&mut self, entity_id: &str) {
        let Some(index) = self.index.as_mut() else {
            return;
        };
        let found = index
            .lookup_by_id(&self.map, entity_id)
            .and_then(|feature| Selection::from_feature(&feature, &self.keys));

        match found {
            Some(selection) => self.show_selection(selection, ShowOptions::default()),
            None => warn!(%entity_id, "initial entity not found"),
        }
    }

    fn handle_tap(&mut self, point: ScreenPoint) {
        let Some(index) = self.index.as_mut() else {
            return;
        };
        let hits = index.lookup_near(&self.map, point);
        let selection = scorer::best_feature(hits, index, &self.map)
            .and_then(|feature| Selection::from_feature(&feature, &self.keys));

        match selection {
            Some(selection) => self.show_selection(
                selection,
                ShowOptions {
                    update_camera: true,
                    animated: true,
                },
            ),
            None => {
                debug!(x = point.x, y = point.y, "tap resolved to nothing");
                self.clear_highlights();
                self.selection = Selection::for_visible_viewport(&self.map);
                self.persist();
            }
        }
    }

    fn render_settled(&mut self) {
        self.selection.sync_to_viewport(&self.map);
        self.persist();
    }

    /// 显示一个选择：清除旧高亮、补全 zoom、持久化、挂高亮、按需移动相机
    pub fn show_selection(&mut self, mut selection: Selection, options: ShowOptions) {
        self.clear_highlights();

        if selection.zoom.is_none() {
            selection.zoom = Some(self.map.camera().zoom);
        }
        self.selection = selection;
        self.persist();
        self.add_highlight();

        if !options.update_camera {
            return;
        }
        if let Some(camera) = self.selection.camera() {
            let camera = constrain_camera(&self.config, camera);
            if options.animated {
                self.map.ease_to(camera);
            } else {
                self.map.jump_to(camera);
            }
        }
    }

    fn add_highlight(&mut self) {
        if self.selection.entity_id.is_none() {
            return;
        }

        let highlight = match &self.selection.bound_feature {
            Some(feature) if feature.is_line() => {
                let layer_id = format!("{HIGHLIGHT_LAYER_PREFIX}{}", self.next_overlay_seq);
                self.next_overlay_seq += 1;
                self.map.add_line_overlay(&layer_id, feature);
                Highlight::Overlay(layer_id)
            }
            _ => {
                let popup = self.selection.title.as_deref().filter(|t| !t.is_empty());
                Highlight::Marker(self.map.add_marker(self.selection.coords(), popup))
            }
        };
        self.highlights.push(highlight);

        let class = self.has_selection_class();
        set_class_presence(self.page.container_classes(), &class, true);
    }

    /// 移除所有高亮 (没有高亮时什么也不做)
    fn clear_highlights(&mut self) {
        for highlight in self.highlights.drain(..) {
            match highlight {
                Highlight::Marker(id) => self.map.remove_marker(id),
                Highlight::Overlay(layer_id) => self.map.remove_layer(&layer_id),
            }
        }
        let class = self.has_selection_class();
        set_class_presence(self.page.container_classes(), &class, false);
    }

    fn has_selection_class(&self) -> String {
        format!("{}-has-selection", self.config.namespace)
    }

    /// 写入历史记录、文档标题与 App Banner
    fn persist(&mut self) {
        let state = self.selection.persistable_state();
        let title = document_title(&self.config.site_title, self.selection.title.as_deref());
        let url = self.selection.shareable_url(&self.base);

        self.page.set_document_title(&title);
        self.page.replace_history_state(&state, &title, &url);
        if let Some(app_id) = &self.config.app_store_id {
            self.page
                .set_meta_content(APP_BANNER_META, &app_banner_content(app_id, &url));
        }
        info!(%url, "history state replaced");
    }
}

/// 把相机限制在配置的缩放范围与地理边界内
pub fn constrain_camera(config: &AppConfig, camera: Camera) -> Camera {
    let [[west, south], [east, north]] = config.max_bounds;
    Camera {
        center: LngLat::new(
            camera.center.lon.max(west).min(east),
            camera.center.lat.max(south).min(north),
        ),
        zoom: camera.zoom.max(config.min_zoom).min(config.max_zoom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::FeatureRef;
    use crate::memory_map::fixtures::*;
    use crate::memory_map::{MemoryMap, Transition};
    use crate::page::MemoryPage;
    use std::time::Duration;

    type Controller = SelectionController<MemoryMap, MemoryPage>;

    const LON: f64 = -77.572;
    const LAT: f64 = 43.025;

    fn controller(features: Vec<FeatureRef>, url: Option<&str>) -> Controller {
        let map = with_features(map_at(LON, LAT, 14.88), features);
        SelectionController::new(AppConfig::default(), map, MemoryPage::new(), url).unwrap()
    }

    /// 完成握手，返回当前时间
    fn make_ready(c: &mut Controller, t0: Instant) -> Instant {
        c.handle_event(MapEvent::Loaded, t0);
        let now = t0 + Duration::from_millis(1500);
        c.poll_timers(now);
        assert_eq!(c.state(), ControllerState::Ready);
        now
    }

    fn durand() -> FeatureRef {
        park("P1", "Durand", LON, LAT, 0.002)
    }

    fn tap(c: &mut Controller, at: LngLat, now: Instant) {
        let point = c.map().project(at);
        c.handle_event(MapEvent::Click(point), now);
    }

    #[test]
    fn test_construction_persists_default_location() {
        let c = controller(vec![], None);
        assert_eq!(c.state(), ControllerState::Uninitialized);
        assert_eq!(c.page().history.len(), 1);
        let entry = c.page().current().unwrap();
        assert_eq!(entry.url, "http://localhost:4000/?lat=43.0250&lon=-77.5720&zoom=14.9");
        assert_eq!(entry.title, "#TrailsRoc Maps");
        assert_eq!(c.page().title, "#TrailsRoc Maps");
        assert_eq!(
            c.page().meta.get(APP_BANNER_META).map(String::as_str),
            Some("app-id=906444281, app-argument=http://localhost:4000/?lat=43.0250&lon=-77.5720&zoom=14.9")
        );
        assert_eq!(c.map().last_transition(), Some(Transition::Jump));
    }

    #[test]
    fn test_construction_from_url_jumps_camera() {
        let c = controller(vec![], Some("http://localhost:4000/?lat=43.1&lon=-77.6&zoom=12"));
        assert_eq!(c.map().camera().center, ll(-77.6, 43.1));
        assert_eq!(c.map().camera().zoom, 12.0);
        assert_eq!(c.selection().entity_id, None);
    }

    #[test]
    fn test_camera_is_constrained() {
        let c = controller(vec![], Some("http://localhost:4000/?lat=50&lon=-77.5&zoom=22"));
        let camera = c.map().camera();
        assert_eq!(camera.zoom, 18.0);
        assert_eq!(camera.center.lat, 43.53);
        assert_eq!(camera.center.lon, -77.5);
    }

    #[test]
    fn test_handshake_is_idempotent() {
        let mut c = controller(vec![durand()], None);
        let t0 = Instant::now();

        c.handle_event(MapEvent::Loaded, t0);
        assert_eq!(c.state(), ControllerState::StyleLoading);
        assert_eq!(c.next_deadline(), Some(t0 + Duration::from_millis(1500)));

        // 重复信号不会推迟截止时间
        c.handle_event(MapEvent::Loaded, t0 + Duration::from_millis(1000));
        assert_eq!(c.next_deadline(), Some(t0 + Duration::from_millis(1500)));

        // 握手完成前的点击被忽略
        tap(&mut c, ll(LON, LAT), t0 + Duration::from_millis(1200));
        assert_eq!(c.page().history.len(), 1);
        assert!(c.index().is_none());

        c.poll_timers(t0 + Duration::from_millis(1499));
        assert_eq!(c.state(), ControllerState::StyleLoading);
        c.poll_timers(t0 + Duration::from_millis(1500));
        assert_eq!(c.state(), ControllerState::Ready);
        assert_eq!(c.next_deadline(), None);

        c.handle_event(MapEvent::Loaded, t0 + Duration::from_millis(2000));
        assert_eq!(c.state(), ControllerState::Ready);
        assert_eq!(c.next_deadline(), None);
    }

    #[test]
    fn test_handshake_waits_for_style() {
        let mut c = controller(vec![durand()], None);
        c.map_mut().set_style_loaded(false);
        let t0 = Instant::now();

        c.handle_event(MapEvent::Loaded, t0);
        c.poll_timers(t0 + Duration::from_secs(2));
        assert_eq!(c.state(), ControllerState::Uninitialized);
        assert!(c.index().is_none());

        c.map_mut().set_style_loaded(true);
        make_ready(&mut c, t0 + Duration::from_secs(3));
    }

    #[test]
    fn test_handshake_retries_on_later_loaded_signal() {
        let mut c = controller(vec![durand()], None);
        c.map_mut().set_style_loaded(false);
        let t0 = Instant::now();

        c.handle_event(MapEvent::Loaded, t0);
        c.handle_event(MapEvent::Loaded, t0 + Duration::from_millis(1000));
        c.poll_timers(t0 + Duration::from_millis(1500));
        assert_eq!(c.state(), ControllerState::StyleLoading);
        assert_eq!(c.next_deadline(), Some(t0 + Duration::from_millis(2500)));

        c.map_mut().set_style_loaded(true);
        c.poll_timers(t0 + Duration::from_millis(2600));
        assert_eq!(c.state(), ControllerState::Ready);
        assert!(c.index().is_some());
        assert_eq!(c.next_deadline(), None);
    }

    #[test]
    fn test_retry_is_dropped_once_ready() {
        let mut c = controller(vec![], None);
        let t0 = Instant::now();
        c.handle_event(MapEvent::Loaded, t0);
        c.handle_event(MapEvent::Loaded, t0 + Duration::from_millis(1000));
        c.poll_timers(t0 + Duration::from_millis(1500));
        assert_eq!(c.state(), ControllerState::Ready);
        assert_eq!(c.next_deadline(), None);

        // 之后样式失效也不会重新握手
        c.map_mut().set_style_loaded(false);
        c.poll_timers(t0 + Duration::from_secs(5));
        assert_eq!(c.state(), ControllerState::Ready);
    }

    #[test]
    fn test_tap_selects_park_with_marker() {
        let mut c = controller(vec![durand()], None);
        let now = make_ready(&mut c, Instant::now());

        tap(&mut c, ll(LON, LAT), now);

        let sel = c.selection();
        assert_eq!(sel.entity_id.as_deref(), Some("P1"));
        assert_eq!(sel.title.as_deref(), Some("Durand"));
        assert_eq!(sel.zoom, Some(14.88));

        let markers = c.map().markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].popup.as_deref(), Some("Durand"));
        assert!(c.map().overlays().is_empty());
        assert!(c.page().classes.contains("trailsroc-has-selection"));
        assert_eq!(c.map().last_transition(), Some(Transition::Ease));

        let entry = c.page().current().unwrap();
        assert_eq!(entry.state.item_id.as_deref(), Some("P1"));
        assert_eq!(entry.title, "Durand — #TrailsRoc Maps");
        assert!(entry.url.ends_with("&itemID=P1"));
    }

    #[test]
    fn test_tap_on_border_selects_owning_park() {
        let border = park_border("b1", "P1", -77.566, LAT, 0.001);
        let mut c = controller(vec![durand(), border], None);
        let now = make_ready(&mut c, Instant::now());

        tap(&mut c, ll(-77.565, LAT), now);

        let sel = c.selection();
        assert_eq!(sel.entity_id.as_deref(), Some("P1"));
        assert_eq!(sel.title.as_deref(), Some("Durand"));
        assert!((sel.lon - LON).abs() < 1e-9);
    }

    #[test]
    fn test_tap_on_trail_adds_overlay() {
        let line = vec![ll(-77.575, 43.028), ll(-77.569, 43.028)];
        let mut c = controller(vec![trail("t1", Some("EC"), line)], None);
        let now = make_ready(&mut c, Instant::now());

        tap(&mut c, ll(-77.572, 43.028), now);
        assert_eq!(c.selection().entity_id.as_deref(), Some("t1"));
        assert!(c.map().markers().is_empty());
        assert_eq!(c.map().overlays(), ["selection-highlight-1".to_string()]);

        // 再次点击：旧高亮先被清除，新图层 id 唯一
        tap(&mut c, ll(-77.572, 43.028), now);
        assert_eq!(c.map().overlays(), ["selection-highlight-2".to_string()]);
        assert!(c
            .index()
            .unwrap()
            .layer_ids()
            .iter()
            .all(|l| !l.starts_with(HIGHLIGHT_LAYER_PREFIX)));
    }

    #[test]
    fn test_tap_miss_clears_selection_and_uses_viewport() {
        let mut c = controller(vec![durand()], None);
        let now = make_ready(&mut c, Instant::now());

        tap(&mut c, ll(LON, LAT), now);
        assert_eq!(c.map().markers().len(), 1);

        c.handle_event(MapEvent::Click(ScreenPoint::new(20.0, 20.0)), now);
        let sel = c.selection();
        assert_eq!(sel.entity_id, None);
        assert_eq!(sel.coords(), c.map().camera().center);
        assert!(c.map().markers().is_empty());
        assert!(!c.page().classes.contains("trailsroc-has-selection"));
        assert_eq!(c.page().current().unwrap().state.item_id, None);
    }

    #[test]
    fn test_render_burst_persists_once() {
        let mut c = controller(vec![durand()], None);
        let mut now = make_ready(&mut c, Instant::now());
        let before = c.page().history.len();

        c.map_mut().jump_to(Camera {
            center: ll(-77.58, 43.03),
            zoom: 15.5,
        });
        for _ in 0..5 {
            c.handle_event(MapEvent::Render, now);
            now += Duration::from_millis(100);
        }
        let last_render = now - Duration::from_millis(100);

        c.poll_timers(last_render + Duration::from_millis(749));
        assert_eq!(c.page().history.len(), before);

        c.poll_timers(last_render + Duration::from_millis(750));
        assert_eq!(c.page().history.len(), before + 1);
        c.poll_timers(last_render + Duration::from_secs(5));
        assert_eq!(c.page().history.len(), before + 1);

        let state = &c.page().current().unwrap().state;
        assert_eq!(state.zoom, Some(15.5));
        assert_eq!(state.lat, Some(43.03));
        assert_eq!(state.lon, Some(-77.58));
    }

    #[test]
    fn test_render_before_ready_is_ignored() {
        let mut c = controller(vec![], None);
        let t0 = Instant::now();
        c.handle_event(MapEvent::Render, t0);
        assert_eq!(c.next_deadline(), None);
    }

    #[test]
    fn test_render_sync_keeps_entity() {
        let mut c = controller(vec![durand()], None);
        let now = make_ready(&mut c, Instant::now());
        tap(&mut c, ll(LON, LAT), now);

        c.handle_event(MapEvent::Render, now);
        c.poll_timers(now + Duration::from_millis(750));
        let entry = c.page().current().unwrap();
        assert_eq!(entry.state.item_id.as_deref(), Some("P1"));
        assert_eq!(entry.state.title.as_deref(), Some("Durand"));
    }

    #[test]
    fn test_initial_item_resolved_without_moving_camera() {
        let mut c = controller(
            vec![durand()],
            Some("http://localhost:4000/?lat=43.1&lon=-77.6&zoom=12&itemID=P1"),
        );
        assert_eq!(c.selection().entity_id.as_deref(), Some("P1"));
        assert_eq!(c.selection().title, None);

        make_ready(&mut c, Instant::now());

        let sel = c.selection();
        assert_eq!(sel.entity_id.as_deref(), Some("P1"));
        assert_eq!(sel.title.as_deref(), Some("Durand"));
        assert_eq!(sel.zoom, Some(12.0));
        assert_eq!(c.map().markers().len(), 1);
        assert_eq!(c.map().camera().center, ll(-77.6, 43.1));
        assert_eq!(c.map().last_transition(), Some(Transition::Jump));
    }

    #[test]
    fn test_initial_item_missing_keeps_url_selection() {
        let url = "http://localhost:4000/?lat=43.1&lon=-77.6&itemID=gone";
        let mut c = controller(vec![], Some(url));
        make_ready(&mut c, Instant::now());
        assert_eq!(c.selection().entity_id.as_deref(), Some("gone"));
        assert!(c.map().markers().is_empty());
    }

    #[test]
    fn test_style_reload_rebuilds_index() {
        let url = "http://localhost:4000/?lat=43.1&lon=-77.6&itemID=P1";
        let mut c = controller(vec![durand()], Some(url));
        let now = make_ready(&mut c, Instant::now());
        assert_eq!(c.index().unwrap().cached_len(), 1);

        c.map_mut().add_layer("trailsroc-extra");
        c.handle_event(MapEvent::StyleLoaded, now);
        let index = c.index().unwrap();
        assert_eq!(index.cached_len(), 0);
        assert!(index.layer_ids().contains(&"trailsroc-extra".to_string()));
    }

    #[test]
    fn test_marker_without_title_has_no_popup() {
        let mut unnamed = point("s1", "shelter", "", ll(LON, LAT));
        if let Some(props) = unnamed.properties.as_mut() {
            props.remove("trailsroc-name");
        }
        let empty = point("s2", "parking", "", ll(LON, LAT));

        let mut c = controller(vec![unnamed], None);
        let now = make_ready(&mut c, Instant::now());
        tap(&mut c, ll(LON, LAT), now);
        assert_eq!(c.selection().entity_id.as_deref(), Some("s1"));
        assert_eq!(c.map().markers().len(), 1);
        assert_eq!(c.map().markers()[0].popup, None);
        assert_eq!(c.page().current().unwrap().title, "#TrailsRoc Maps");

        let mut c = controller(vec![empty], None);
        let now = make_ready(&mut c, Instant::now());
        tap(&mut c, ll(LON, LAT), now);
        assert_eq!(c.selection().entity_id.as_deref(), Some("s2"));
        assert_eq!(c.map().markers()[0].popup, None);
    }

    #[test]
    fn test_no_banner_meta_without_app_id() {
        let config = AppConfig {
            app_store_id: None,
            ..AppConfig::default()
        };
        let map = with_features(map_at(LON, LAT, 14.88), vec![durand()]);
        let mut c = SelectionController::new(config, map, MemoryPage::new(), None).unwrap();
        let now = make_ready(&mut c, Instant::now());
        tap(&mut c, ll(LON, LAT), now);

        assert_eq!(c.page().history.len(), 2);
        assert!(c.page().meta.is_empty());
        assert_eq!(c.page().title, "Durand — #TrailsRoc Maps");
    }

    #[test]
    fn test_data_reload_drops_stale_features() {
        let mut c = controller(vec![durand()], None);
        let now = make_ready(&mut c, Instant::now());
        tap(&mut c, ll(LON, LAT), now);
        assert_eq!(c.selection().entity_id.as_deref(), Some("P1"));

        c.map_mut().clear_features();
        c.handle_event(MapEvent::StyleLoaded, now);
        assert_eq!(c.index().unwrap().cached_len(), 0);

        // 数据已清空：点击原位置不再选中旧公园
        tap(&mut c, ll(LON, LAT), now);
        assert_eq!(c.selection().entity_id, None);
        assert!(c.map().markers().is_empty());
        assert!(c.map().overlays().is_empty());
    }

    #[test]
    fn test_constrain_camera() {
        let config = AppConfig::default();
        let camera = constrain_camera(
            &config,
            Camera {
                center: ll(-80.0, 40.0),
                zoom: 3.0,
            },
        );
        assert_eq!(camera.center, ll(-78.9, 42.1));
        assert_eq!(camera.zoom, 7.0);
    }
}
