use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;

use crate::AppState;
use crate::error::AppError;
use crate::services::places;
use crate::utils::geo::round_coordinate;
use crate::utils::{success_to_api_response, success_with_msg};

use super::model::{CachedNearby, GeoCache, SortBy, assemble_nearby_page};

const DEFAULT_PAGE_LIMIT: u32 = 10;
const MAX_PAGE_LIMIT: u32 = 50;

/// 查询参数全部按字符串接收,数值解析和范围校验在 handler 里做,
/// 保证格式错误也走统一的响应结构
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyQuery {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub query: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    #[serde(rename = "type")]
    pub type_filter: Option<String>,
    pub sort_by: Option<String>,
}

#[axum::debug_handler]
pub async fn find_nearby(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> Result<impl IntoResponse, AppError> {
    let latitude: f64 = query
        .latitude
        .as_deref()
        .unwrap_or("")
        .parse()
        .map_err(|_| AppError::Validation("坐标不合法".into()))?;
    let longitude: f64 = query
        .longitude
        .as_deref()
        .unwrap_or("")
        .parse()
        .map_err(|_| AppError::Validation("坐标不合法".into()))?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::Validation("坐标超出有效范围".into()));
    }

    let page = query
        .page
        .as_deref()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(1)
        .max(1);
    let limit = query
        .limit
        .as_deref()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT);

    // 未传检索词或全是空白时退回配置的默认词表
    let caller_terms: Vec<String> = query
        .query
        .as_deref()
        .map(|q| q.split(',').map(str::to_string).collect())
        .unwrap_or_default();
    let mut terms = GeoCache::normalize_terms(&caller_terms);
    if terms.is_empty() {
        terms = GeoCache::normalize_terms(&state.config.geo_default_terms);
    }

    let precision = state.config.geo_coord_precision;
    let cache_key = GeoCache::cache_key(latitude, longitude, &terms, precision);

    let results = match GeoCache::lookup(&state.redis, &cache_key).await {
        Some(cached) => cached,
        None => {
            let fetched =
                places::fetch_support_points(&state.http, &state.config, latitude, longitude, &terms)
                    .await?;
            let entry = CachedNearby {
                latitude: round_coordinate(latitude, precision),
                longitude: round_coordinate(longitude, precision),
                queries: terms.clone(),
                results: fetched.clone(),
                created_at: Utc::now(),
            };
            GeoCache::store(
                &state.redis,
                &cache_key,
                &entry,
                state.config.geo_cache_ttl_secs,
            )
            .await;
            fetched
        }
    };

    let nearby = assemble_nearby_page(
        results,
        latitude,
        longitude,
        query.type_filter.as_deref(),
        query.sort_by.as_deref().and_then(SortBy::parse),
        page,
        limit,
    );

    // 零结果是正常返回,不是错误
    if nearby.total_results == 0 {
        return Ok((
            StatusCode::OK,
            success_with_msg("附近未找到相关支持点", nearby),
        ));
    }
    Ok((StatusCode::OK, success_to_api_response(nearby)))
}
