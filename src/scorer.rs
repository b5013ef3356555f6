//! 候选要素评分
//!
//! 一次点击可能命中多个重叠要素 (公园面、公园边界、步道、兴趣点)。
//! 每个命中先做间接解析 (parkBorder → 所属 park)，再过滤掉不可选的，
//! 最后按分数升序排序，分数最低者胜出，同分保持原始顺序。
//!
//! | 类型 | 分数 |
//! |---|---|
//! | parkBorder | 30 |
//! | park | 25 |
//! | trailSegment | 20 (没有 shortName 时 +1) |
//! | 常见设施 point | 10 |
//! | 其它 point | 11 |
//! | 其它 | 100 |
//!
//! 间接得到的候选再 +1，使直接命中的同一实体优先。

use crate::feature::{FeatureKind, FeatureRef, PropertyKeys};
use crate::feature_index::FeatureIndex;
use crate::map_engine::MapEngine;
use tracing::debug;

const SCORE_PARK_BORDER: i32 = 30;
const SCORE_PARK: i32 = 25;
const SCORE_TRAIL: i32 = 20;
const SCORE_COMMON_POINT: i32 = 10;
const SCORE_POINT: i32 = 11;
const SCORE_UNRECOGNIZED: i32 = 100;
const PENALTY_UNNAMED_TRAIL: i32 = 1;
const PENALTY_INDIRECT: i32 = 1;

/// 单次查询中的一个候选
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// 有效要素 (可能已被替换为所属 park)
    pub feature: FeatureRef,
    pub is_indirect: bool,
    pub score: i32,
}

impl Candidate {
    pub fn new(feature: FeatureRef, is_indirect: bool, keys: &PropertyKeys) -> Self {
        let score = score(&feature, is_indirect, keys);
        Self {
            feature,
            is_indirect,
            score,
        }
    }

    /// 对原始命中做间接解析
    ///
    /// 带 parkID 的 parkBorder 尝试换成所属 park；找不到 park 时退回边界本身，
    /// 两种情况都标记为间接。
    pub fn resolve<M: MapEngine + ?Sized>(
        raw: FeatureRef,
        index: &mut FeatureIndex,
        map: &M,
        keys: &PropertyKeys,
    ) -> Self {
        let parent_id = match raw.kind(keys) {
            FeatureKind::ParkBorder => raw.park_id(keys).map(str::to_string),
            _ => None,
        };

        match parent_id {
            Some(park_id) => {
                let effective = match index.lookup_by_id(map, &park_id) {
                    Some(park) => park,
                    None => {
                        debug!(%park_id, "park lookup failed, keeping border feature");
                        raw
                    }
                };
                Self::new(effective, true, keys)
            }
            None => Self::new(raw, false, keys),
        }
    }

    pub fn is_selectable(&self, keys: &PropertyKeys) -> bool {
        match self.feature.kind(keys) {
            FeatureKind::Park | FeatureKind::TrailSegment | FeatureKind::Point(_) => true,
            FeatureKind::ParkBorder => self.feature.park_id(keys).is_some(),
            FeatureKind::Other(_) | FeatureKind::Unknown => false,
        }
    }

    pub fn debug_string(&self, keys: &PropertyKeys) -> String {
        format!(
            "<FC #{} @{}>",
            self.feature.id(keys).unwrap_or("?"),
            self.score
        )
    }
}

/// 计算分数 (越低越好)
pub fn score(feature: &FeatureRef, is_indirect: bool, keys: &PropertyKeys) -> i32 {
    let kind = feature.kind(keys);
    let mut score = match kind {
        FeatureKind::ParkBorder => SCORE_PARK_BORDER,
        FeatureKind::Park => SCORE_PARK,
        FeatureKind::TrailSegment => {
            if feature.short_name(keys).is_some() {
                SCORE_TRAIL
            } else {
                SCORE_TRAIL + PENALTY_UNNAMED_TRAIL
            }
        }
        FeatureKind::Point(_) if kind.is_common_point() => SCORE_COMMON_POINT,
        FeatureKind::Point(_) => SCORE_POINT,
        FeatureKind::Other(_) | FeatureKind::Unknown => SCORE_UNRECOGNIZED,
    };
    if is_indirect {
        score += PENALTY_INDIRECT;
    }
    score
}

/// 解析、过滤并排序 (稳定排序，同分保持命中顺序)
pub fn rank<M: MapEngine + ?Sized>(
    hits: Vec<FeatureRef>,
    index: &mut FeatureIndex,
    map: &M,
) -> Vec<Candidate> {
    let keys = index.keys().clone();
    let mut candidates: Vec<Candidate> = hits
        .into_iter()
        .map(|raw| Candidate::resolve(raw, index, map, &keys))
        .filter(|c| c.is_selectable(&keys))
        .collect();

    candidates.sort_by_key(|c| c.score);

    debug!(
        candidates = ?candidates.iter().map(|c| c.debug_string(&keys)).collect::<Vec<_>>(),
        "ranked tap candidates"
    );
    candidates
}

/// 最佳候选的有效要素
pub fn best_feature<M: MapEngine + ?Sized>(
    hits: Vec<FeatureRef>,
    index: &mut FeatureIndex,
    map: &M,
) -> Option<FeatureRef> {
    rank(hits, index, map).into_iter().next().map(|c| c.feature)
}
