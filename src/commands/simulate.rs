//! 会话回放命令
//!
//! 通过事件循环回放一段脚本：地图加载 → 若干次点击，每次点击后跟一串渲染帧。
//! 输出最终选择和所有持久化过的历史记录。

use crate::config::AppConfig;
use crate::controller::SelectionController;
use crate::event_loop;
use crate::map_engine::MapEvent;
use crate::memory_map::MemoryMap;
use crate::page::{MemoryPage, PersistedEntry};
use crate::selection::Selection;
use crate::types::ScreenPoint;
use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

/// 回放脚本
#[derive(Debug, Clone)]
pub struct SimulationScript {
    pub initial_url: Option<String>,
    /// 屏幕坐标点击序列
    pub taps: Vec<ScreenPoint>,
    /// 每次点击之后的渲染帧数 (模拟相机动画)
    pub frames_per_tap: usize,
    pub frame_interval: Duration,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub state: String,
    pub selection: Selection,
    pub history: Vec<PersistedEntry>,
    pub markers: usize,
    pub overlays: Vec<String>,
}

pub async fn simulate(
    config: AppConfig,
    map: MemoryMap,
    script: &SimulationScript,
) -> Result<SimulationReport> {
    let settle = config.load_settle();
    let page = MemoryPage::new();
    let mut controller =
        SelectionController::new(config, map, page, script.initial_url.as_deref())
            .context("无法创建选择控制器")?;

    let (tx, rx) = mpsc::unbounded_channel();
    let producer = async move {
        if tx.send(MapEvent::Loaded).is_err() {
            return;
        }
        tokio::time::sleep(settle + script.frame_interval).await;

        for tap in &script.taps {
            if tx.send(MapEvent::Click(*tap)).is_err() {
                return;
            }
            for _ in 0..script.frames_per_tap {
                if tx.send(MapEvent::Render).is_err() {
                    return;
                }
                tokio::time::sleep(script.frame_interval).await;
            }
        }
    };
    tokio::join!(event_loop::run(&mut controller, rx), producer);

    info!(
        persisted = controller.page().history.len(),
        "simulation finished"
    );

    Ok(SimulationReport {
        state: format!("{:?}", controller.state()),
        selection: controller.selection().clone(),
        history: controller.page().history.clone(),
        markers: controller.map().markers().len(),
        overlays: controller.map().overlays().to_vec(),
    })
}
