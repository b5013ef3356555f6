//! 页面宿主接口
//!
//! 持久化选择状态时需要的浏览器能力：替换历史记录、设置文档标题、
//! 更新 meta 标签、切换容器元素的 CSS class。

use crate::types::HistoryState;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use url::Url;

/// iOS Smart App Banner 的 meta 名称
pub const APP_BANNER_META: &str = "apple-itunes-app";

/// 元素的 class 列表
pub trait ClassList {
    fn contains(&self, name: &str) -> bool;
    fn add(&mut self, name: &str);
    fn remove(&mut self, name: &str);
}

impl ClassList for BTreeSet<String> {
    fn contains(&self, name: &str) -> bool {
        BTreeSet::contains(self, name)
    }

    fn add(&mut self, name: &str) {
        self.insert(name.to_string());
    }

    fn remove(&mut self, name: &str) {
        BTreeSet::remove(self, name);
    }
}

/// 按 `flag` 添加或移除 class，已处于目标状态时不做任何事
pub fn set_class_presence<E: ClassList + ?Sized>(element: &mut E, name: &str, flag: bool) {
    if flag && !element.contains(name) {
        element.add(name);
    }
    if !flag && element.contains(name) {
        element.remove(name);
    }
}

pub trait PageHost {
    /// 替换当前历史记录条目 (不新增条目)
    fn replace_history_state(&mut self, state: &HistoryState, title: &str, url: &Url);

    fn set_document_title(&mut self, title: &str);

    fn set_meta_content(&mut self, name: &str, content: &str);

    /// 地图容器元素的 class 列表
    fn container_classes(&mut self) -> &mut dyn ClassList;
}

/// `"<title> — <site>"`，没有标题时只用站点名
pub fn document_title(site_title: &str, title: Option<&str>) -> String {
    match title.filter(|t| !t.is_empty()) {
        Some(t) => format!("{t} — {site_title}"),
        None => site_title.to_string(),
    }
}

/// Smart App Banner 内容，`app-argument` 让已安装的 App 打开同一位置
pub fn app_banner_content(app_id: &str, url: &Url) -> String {
    format!("app-id={app_id}, app-argument={url}")
}

/// 一次 `replace_history_state` 调用的记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedEntry {
    pub state: HistoryState,
    pub title: String,
    pub url: String,
}

/// 内存页面：记录所有持久化调用 (测试与 CLI 使用)
#[derive(Debug, Default)]
pub struct MemoryPage {
    pub history: Vec<PersistedEntry>,
    pub title: String,
    pub meta: BTreeMap<String, String>,
    pub classes: BTreeSet<String>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 最近一次持久化的条目
    pub fn current(&self) -> Option<&PersistedEntry> {
        self.history.last()
    }
}

impl PageHost for MemoryPage {
    fn replace_history_state(&mut self, state: &HistoryState, title: &str, url: &Url) {
        self.history.push(PersistedEntry {
            state: state.clone(),
            title: title.to_string(),
            url: url.to_string(),
        });
    }

    fn set_document_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn set_meta_content(&mut self, name: &str, content: &str) {
        self.meta.insert(name.to_string(), content.to_string());
    }

    fn container_classes(&mut self) -> &mut dyn ClassList {
        &mut self.classes
    }
}
