//! 地图引擎能力接口
//!
//! 核心不绘制任何东西，它只通过这个窄接口读取渲染状态、移动相机、
//! 挂载高亮。真实实现包装浏览器中的矢量地图引擎；
//! `memory_map::MemoryMap` 是测试与 CLI 使用的内存实现。

use crate::feature::FeatureRef;
use crate::types::{Camera, LngLat, ScreenBox, ScreenPoint};

/// 标记 (marker) 句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId(pub u64);

/// 边界框查询的过滤条件
#[derive(Debug, Clone, Copy)]
pub struct BoxQuery<'a> {
    /// 只查询这些图层
    pub layers: &'a [String],
    /// 要素必须带有此属性
    pub has_property: &'a str,
}

/// 地图引擎发出的事件
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapEvent {
    /// 样式 (或其数据源) 加载/重载完成
    StyleLoaded,
    /// 地图首次加载完成，可以开始查询
    Loaded,
    /// 点击，携带屏幕坐标
    Click(ScreenPoint),
    /// 每帧渲染完成
    Render,
}

pub trait MapEngine {
    /// 当前样式中的所有图层 id
    fn style_layer_ids(&self) -> Vec<String>;

    /// 引擎是否报告样式已就绪
    fn is_style_loaded(&self) -> bool;

    /// 精确属性查询：`properties[key] == value`，限定在 `layers` 内
    fn query_by_property(&self, layers: &[String], key: &str, value: &str) -> Vec<FeatureRef>;

    /// 屏幕边界框查询
    fn query_box(&self, bbox: ScreenBox, query: BoxQuery<'_>) -> Vec<FeatureRef>;

    fn camera(&self) -> Camera;

    /// 无动画跳转
    fn jump_to(&mut self, camera: Camera);

    /// 带动画过渡
    fn ease_to(&mut self, camera: Camera);

    fn add_marker(&mut self, at: LngLat, popup: Option<&str>) -> MarkerId;

    fn remove_marker(&mut self, id: MarkerId);

    /// 添加一条半透明线图层，用于高亮线状要素
    fn add_line_overlay(&mut self, layer_id: &str, feature: &FeatureRef);

    fn remove_layer(&mut self, layer_id: &str);
}
