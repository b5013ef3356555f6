//! Web 墨卡托投影 (EPSG:3857)
//!
//! 经纬度 ↔ 墨卡托米 ↔ 世界像素 ↔ 屏幕像素。
//! 世界像素采用 512 像素瓦片 (与矢量瓦片地图引擎一致)，
//! 缩放级别 z 下整个世界宽 `512 × 2^z` 像素。

use crate::types::{Camera, LngLat, ScreenPoint};
use std::f64::consts::PI;

/// 地球赤道半周长（米）
/// 计算方式：地球半径 6378137m × π
const EARTH_HALF_CIRCUMFERENCE: f64 = 20037508.342789244;

/// 墨卡托投影的纬度上限
const MAX_MERCATOR_LAT: f64 = 85.051129;

/// 矢量瓦片边长（像素）
pub const TILE_SIZE: f64 = 512.0;

/// 将 WGS84 经纬度转换为 Web 墨卡托坐标（米）
///
/// - x = lon × (半周长 / 180)
/// - y = ln(tan((90 + lat) × π / 360)) × (半周长 / π)
#[inline]
pub fn lonlat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let x = lon * EARTH_HALF_CIRCUMFERENCE / 180.0;

    // 限制纬度范围，避免 tan 函数在极点附近产生无穷大
    let lat_clamped = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let lat_rad = (90.0 + lat_clamped) * PI / 360.0;
    let y = lat_rad.tan().ln() * EARTH_HALF_CIRCUMFERENCE / PI;

    (x, y)
}

/// 将 Web 墨卡托坐标转换回 WGS84 经纬度
#[inline]
pub fn mercator_to_lonlat(x: f64, y: f64) -> (f64, f64) {
    let lon = x * 180.0 / EARTH_HALF_CIRCUMFERENCE;
    let lat = (2.0 * (y * PI / EARTH_HALF_CIRCUMFERENCE).exp().atan() - PI / 2.0) * 180.0 / PI;
    (lon, lat)
}

/// 缩放级别 z 下的世界宽度（像素）
#[inline]
pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// 经纬度 → 世界像素 (左上角为原点，y 向下)
pub fn lnglat_to_world_px(p: LngLat, zoom: f64) -> (f64, f64) {
    let (mx, my) = lonlat_to_mercator(p.lon, p.lat);
    let size = world_size(zoom);
    let full = 2.0 * EARTH_HALF_CIRCUMFERENCE;
    let px = (mx + EARTH_HALF_CIRCUMFERENCE) / full * size;
    let py = (EARTH_HALF_CIRCUMFERENCE - my) / full * size;
    (px, py)
}

/// 世界像素 → 经纬度
pub fn world_px_to_lnglat(px: f64, py: f64, zoom: f64) -> LngLat {
    let size = world_size(zoom);
    let full = 2.0 * EARTH_HALF_CIRCUMFERENCE;
    let mx = px / size * full - EARTH_HALF_CIRCUMFERENCE;
    let my = EARTH_HALF_CIRCUMFERENCE - py / size * full;
    let (lon, lat) = mercator_to_lonlat(mx, my);
    LngLat::new(lon, lat)
}

/// 屏幕视口：相机 + 画布尺寸
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenTransform {
    pub camera: Camera,
    pub width: f64,
    pub height: f64,
}

impl ScreenTransform {
    /// 经纬度 → 屏幕像素 (相机中心位于画布中心)
    pub fn project(&self, p: LngLat) -> ScreenPoint {
        let (cx, cy) = lnglat_to_world_px(self.camera.center, self.camera.zoom);
        let (px, py) = lnglat_to_world_px(p, self.camera.zoom);
        ScreenPoint::new(px - cx + self.width / 2.0, py - cy + self.height / 2.0)
    }

    /// 屏幕像素 → 经纬度
    pub fn unproject(&self, p: ScreenPoint) -> LngLat {
        let (cx, cy) = lnglat_to_world_px(self.camera.center, self.camera.zoom);
        world_px_to_lnglat(
            p.x - self.width / 2.0 + cx,
            p.y - self.height / 2.0 + cy,
            self.camera.zoom,
        )
    }
}
