use std::sync::Arc;

use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client as RedisClient};
use serde::{Deserialize, Serialize};

use crate::utils::geo::{haversine_distance_km, round_coordinate};

const NEARBY_CACHE_PREFIX: &str = "geo:nearby:"; // 附近检索结果缓存前缀

/// 支持点类别:public为公立机构,private为民营机构
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoiCategory {
    Public,
    Private,
}

impl PoiCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoiCategory::Public => "public",
            PoiCategory::Private => "private",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningHours {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_now: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weekday_text: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photo {
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributions: Vec<String>,
}

/// 对客户端暴露的支持点记录,distance 只在响应时计算,不进缓存
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointOfInterest {
    pub id: String,
    pub title: String,
    pub position: Position,
    pub address: String,
    pub category: PoiCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<OpeningHours>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<Photo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// 缓存里的完整条目,过期由 Redis 的 SET EX 负责
#[derive(Debug, Serialize, Deserialize)]
pub struct CachedNearby {
    pub latitude: f64,
    pub longitude: f64,
    pub queries: Vec<String>,
    pub results: Vec<PointOfInterest>,
    pub created_at: DateTime<Utc>,
}

/// 排序方式,未知取值不排序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Distance,
    Rating,
}

impl SortBy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "distance" => Some(SortBy::Distance),
            "rating" => Some(SortBy::Rating),
            _ => None,
        }
    }
}

/// 分页后的响应体
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyPage {
    pub total_results: u64,
    pub page: u32,
    pub total_pages: u32,
    pub results: Vec<PointOfInterest>,
}

pub struct GeoCache;

impl GeoCache {
    /// 规范化检索词:去空白、去重、排序。词序不同的同一组词命中同一个缓存键。
    pub fn normalize_terms(terms: &[String]) -> Vec<String> {
        let mut out: Vec<String> = terms
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// 坐标只在这里取整分桶,距离计算始终用原始坐标
    pub fn cache_key(latitude: f64, longitude: f64, terms: &[String], precision: u32) -> String {
        let lat_rounded = round_coordinate(latitude, precision);
        let lon_rounded = round_coordinate(longitude, precision);
        format!(
            "{}{}:{}:{}",
            NEARBY_CACHE_PREFIX,
            lat_rounded,
            lon_rounded,
            terms.join(",")
        )
    }

    /// 读缓存,任何失败(连接、读取、反序列化)都按未命中处理
    pub async fn lookup(redis: &Arc<RedisClient>, cache_key: &str) -> Option<Vec<PointOfInterest>> {
        if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
            let cached: redis::RedisResult<Option<String>> = conn.get(cache_key).await;
            match cached {
                Ok(Some(json_str)) => match serde_json::from_str::<CachedNearby>(&json_str) {
                    Ok(entry) => {
                        tracing::debug!("Get nearby points from cache: {}", cache_key);
                        return Some(entry.results);
                    }
                    Err(e) => {
                        tracing::debug!("nearby cache entry unreadable, treat as miss: {}", e);
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!("nearby cache read failed, treat as miss: {}", e);
                }
            }
        }
        None
    }

    /// 写缓存是尽力而为,失败只记日志,绝不影响本次请求
    pub async fn store(
        redis: &Arc<RedisClient>,
        cache_key: &str,
        entry: &CachedNearby,
        ttl_secs: u64,
    ) {
        if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
            if let Ok(json_str) = serde_json::to_string(entry) {
                let stored: Result<(), redis::RedisError> =
                    conn.set_ex(cache_key, json_str, ttl_secs).await;
                match stored {
                    Ok(()) => tracing::debug!("Set nearby points to cache: {}", cache_key),
                    Err(e) => tracing::warn!("nearby cache store failed: {}", e),
                }
            }
        }
    }
}

/// 把一组支持点加工成最终分页:标注距离、按类别过滤、排序、切页。
/// 纯函数,入参坐标必须是未取整的原始查询坐标。
pub fn assemble_nearby_page(
    mut results: Vec<PointOfInterest>,
    latitude: f64,
    longitude: f64,
    type_filter: Option<&str>,
    sort_by: Option<SortBy>,
    page: u32,
    limit: u32,
) -> NearbyPage {
    for point in &mut results {
        point.distance = Some(haversine_distance_km(
            latitude,
            longitude,
            point.position.lat,
            point.position.lng,
        ));
    }

    if let Some(filter) = type_filter {
        results.retain(|p| p.category.as_str() == filter);
    }

    match sort_by {
        Some(SortBy::Distance) => {
            results.sort_by(|a, b| {
                a.distance
                    .unwrap_or(f64::MAX)
                    .total_cmp(&b.distance.unwrap_or(f64::MAX))
            });
        }
        Some(SortBy::Rating) => {
            // 无评分按0处理,排到最后
            results.sort_by(|a, b| b.rating.unwrap_or(0.0).total_cmp(&a.rating.unwrap_or(0.0)));
        }
        None => {}
    }

    let total_results = results.len() as u64;
    let total_pages = total_results.div_ceil(limit.max(1) as u64) as u32;
    let start = (page.saturating_sub(1) as usize).saturating_mul(limit as usize);
    let results: Vec<PointOfInterest> = results
        .into_iter()
        .skip(start)
        .take(limit as usize)
        .collect();

    NearbyPage {
        total_results,
        page,
        total_pages,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poi(id: &str, lat: f64, lng: f64, category: PoiCategory, rating: Option<f64>) -> PointOfInterest {
        PointOfInterest {
            id: id.to_string(),
            title: format!("point {}", id),
            position: Position { lat, lng },
            address: "某路1号".to_string(),
            category,
            rating,
            opening_hours: None,
            photos: vec![],
            distance: None,
        }
    }

    #[test]
    fn term_normalization_is_order_insensitive() {
        let a = GeoCache::normalize_terms(&["心理咨询".into(), " 社区服务 ".into()]);
        let b = GeoCache::normalize_terms(&["社区服务".into(), "心理咨询".into()]);
        assert_eq!(a, b);
    }

    #[test]
    fn term_normalization_drops_empty_and_duplicates() {
        let terms = GeoCache::normalize_terms(&[
            "心理咨询".into(),
            "".into(),
            "  ".into(),
            "心理咨询 ".into(),
        ]);
        assert_eq!(terms, vec!["心理咨询".to_string()]);
    }

    #[test]
    fn permuted_terms_share_a_cache_key() {
        let a = GeoCache::normalize_terms(&["甲".into(), "乙".into()]);
        let b = GeoCache::normalize_terms(&["乙".into(), "甲".into()]);
        assert_eq!(
            GeoCache::cache_key(31.2304, 121.4737, &a, 3),
            GeoCache::cache_key(31.2304, 121.4737, &b, 3)
        );
    }

    #[test]
    fn cache_key_buckets_nearby_coordinates() {
        let terms = vec!["心理咨询".to_string()];
        let a = GeoCache::cache_key(31.230412, 121.473701, &terms, 3);
        let b = GeoCache::cache_key(31.230388, 121.473699, &terms, 3);
        assert_eq!(a, b);
        let far = GeoCache::cache_key(31.241, 121.473699, &terms, 3);
        assert_ne!(a, far);
    }

    #[test]
    fn cached_entry_round_trips_without_distance() {
        let entry = CachedNearby {
            latitude: 31.23,
            longitude: 121.47,
            queries: vec!["心理咨询".into()],
            results: vec![poi("a", 31.24, 121.48, PoiCategory::Public, Some(4.2))],
            created_at: Utc::now(),
        };
        let raw = serde_json::to_string(&entry).unwrap();
        assert!(!raw.contains("distance"));
        let parsed: CachedNearby = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.results[0].id, "a");
        assert!(parsed.results[0].distance.is_none());
    }

    // 距离约 0.4 / 1.2 / 3.0 千米的三个点:1度纬度约111.19千米
    fn three_points_by_distance() -> Vec<PointOfInterest> {
        vec![
            poi("mid", 0.010792, 0.0, PoiCategory::Private, Some(3.0)),
            poi("near", 0.003597, 0.0, PoiCategory::Public, None),
            poi("far", 0.026979, 0.0, PoiCategory::Private, Some(4.8)),
        ]
    }

    #[test]
    fn distance_sort_with_page_size_one_returns_nearest_first() {
        let page = assemble_nearby_page(
            three_points_by_distance(),
            0.0,
            0.0,
            None,
            Some(SortBy::Distance),
            1,
            1,
        );
        assert_eq!(page.total_results, 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].id, "near");
        let d = page.results[0].distance.unwrap();
        assert!((d - 0.4).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn all_results_get_distance_annotations() {
        let page = assemble_nearby_page(three_points_by_distance(), 0.0, 0.0, None, None, 1, 10);
        assert!(page.results.iter().all(|p| p.distance.is_some()));
    }

    #[test]
    fn rating_sort_puts_missing_ratings_last() {
        let page = assemble_nearby_page(
            three_points_by_distance(),
            0.0,
            0.0,
            None,
            Some(SortBy::Rating),
            1,
            10,
        );
        let ids: Vec<&str> = page.results.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["far", "mid", "near"]);
    }

    #[test]
    fn type_filter_keeps_matching_category_only() {
        let page = assemble_nearby_page(
            three_points_by_distance(),
            0.0,
            0.0,
            Some("public"),
            None,
            1,
            10,
        );
        assert_eq!(page.total_results, 1);
        assert_eq!(page.results[0].id, "near");
    }

    #[test]
    fn unknown_type_filter_matches_nothing() {
        let page = assemble_nearby_page(
            three_points_by_distance(),
            0.0,
            0.0,
            Some("municipal"),
            None,
            1,
            10,
        );
        assert_eq!(page.total_results, 0);
        assert!(page.results.is_empty());
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn page_past_the_end_is_empty_not_an_error() {
        let page = assemble_nearby_page(three_points_by_distance(), 0.0, 0.0, None, None, 5, 2);
        assert_eq!(page.total_results, 3);
        assert_eq!(page.total_pages, 2);
        assert!(page.results.is_empty());
    }

    #[test]
    fn sort_by_parsing() {
        assert_eq!(SortBy::parse("distance"), Some(SortBy::Distance));
        assert_eq!(SortBy::parse("rating"), Some(SortBy::Rating));
        assert_eq!(SortBy::parse("popularity"), None);
    }
}
