//! TrailMap - 步道地图选择引擎
//!
//! 点击解析与可分享地图状态的 Rust 核心
//!
//! # 模块结构
//!
//! - `selection`: 选择实体 (URL / 要素 / 视口 ↔ 选择)
//! - `feature_index`: 要素索引 (按 id 精确查找 + 按屏幕坐标模糊查找)
//! - `scorer`: 候选要素评分与消歧
//! - `controller`: 选择控制器状态机 (握手、点击、渲染去抖、持久化)
//! - `event_loop`: tokio 事件循环驱动
//! - `map_engine`: 地图引擎能力接口
//! - `memory_map`: 内存地图引擎 (DashMap + R-Tree)
//! - `page`: 页面宿主接口 (历史记录、标题、meta、class)
//! - `feature`: 渲染要素与领域类型
//! - `projection`: Web 墨卡托投影
//! - `config`: 应用配置
//! - `types`: 公共类型定义
//! - `commands`: CLI 子命令处理器

pub mod commands;
pub mod config;
pub mod controller;
pub mod event_loop;
pub mod feature;
pub mod feature_index;
pub mod map_engine;
pub mod memory_map;
pub mod page;
pub mod projection;
pub mod scorer;
pub mod selection;
pub mod types;

pub use config::{AppConfig, Environment};
pub use controller::{ControllerState, SelectionController, ShowOptions};
pub use feature::{FeatureRef, Geometry, PropertyKeys};
pub use feature_index::FeatureIndex;
pub use map_engine::{MapEngine, MapEvent};
pub use memory_map::MemoryMap;
pub use page::{MemoryPage, PageHost};
pub use selection::{Selection, UrlStateError};
pub use types::{Camera, HistoryState, LngLat, ScreenPoint};
