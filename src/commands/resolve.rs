//! URL 解析命令
//!
//! 解析可分享 URL，输出规范化 URL、历史记录状态和外部导航链接

use crate::config::AppConfig;
use crate::selection::Selection;
use crate::types::{Camera, HistoryState};
use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ResolveReport {
    pub selection: Selection,
    pub camera: Option<Camera>,
    pub canonical_url: String,
    pub history_state: HistoryState,
    pub external_url: String,
}

pub fn resolve_url(config: &AppConfig, url: &str) -> Result<ResolveReport> {
    let selection = Selection::parse_shareable_url(url)
        .with_context(|| format!("URL 中没有可用的选择: {url}"))?;
    let base = config.canonical_base()?;

    Ok(ResolveReport {
        camera: selection.camera(),
        canonical_url: selection.shareable_url(&base).to_string(),
        history_state: selection.persistable_state(),
        external_url: selection.external_map_app_url(),
        selection,
    })
}
