use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::common::{PaginatedResponse, Pagination};
use crate::error::AppError;
use crate::routes::content::model::{status, video_categories, Article, Video};
use crate::utils::success_with_msg;
use crate::AppState;

const DEFAULT_PAGE_LIMIT: u32 = 10;
const MAX_PAGE_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApproveVideoRequest {
    pub category: Option<String>,
}

fn parse_or(value: Option<&str>, default: u32) -> u32 {
    value.and_then(|s| s.parse::<u32>().ok()).unwrap_or(default)
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::Validation("ID不合法".to_string()))
}

fn page_window(query: &PendingQuery) -> (u32, u32, i64) {
    let page = parse_or(query.page.as_deref(), 1).max(1);
    let limit = parse_or(query.limit.as_deref(), DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
    let offset = ((page - 1) * limit) as i64;
    (page, limit, offset)
}

#[axum::debug_handler]
pub async fn pending_videos(
    State(state): State<AppState>,
    Query(query): Query<PendingQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (page, limit, offset) = page_window(&query);
    let items = Video::page_pending(&state.pool, limit as i64, offset).await?;
    let total = Video::count_pending(&state.pool).await?;
    let pagination = Pagination::new(page, limit, total as u64);
    Ok((
        StatusCode::OK,
        success_with_msg("获取成功", PaginatedResponse { items, pagination }),
    ))
}

#[axum::debug_handler]
pub async fn approve_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ApproveVideoRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let category = req
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Validation("视频分类不能为空".to_string()))?;
    if !video_categories::is_valid(category) {
        return Err(AppError::Validation("视频分类不合法".to_string()));
    }

    let video = Video::approve(&state.pool, id, category)
        .await?
        .ok_or_else(|| AppError::NotFound("视频不存在".to_string()))?;

    info!("video approved: {} as {}", video.id, video.category);
    Ok((StatusCode::OK, success_with_msg("视频已通过审核", video)))
}

#[axum::debug_handler]
pub async fn reject_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let video = Video::set_status(&state.pool, id, status::REJECTED)
        .await?
        .ok_or_else(|| AppError::NotFound("视频不存在".to_string()))?;

    info!("video rejected: {}", video.id);
    Ok((StatusCode::OK, success_with_msg("视频已拒绝", video)))
}

#[axum::debug_handler]
pub async fn pending_articles(
    State(state): State<AppState>,
    Query(query): Query<PendingQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (page, limit, offset) = page_window(&query);
    let items = Article::page_pending(&state.pool, limit as i64, offset).await?;
    let total = Article::count_pending(&state.pool).await?;
    let pagination = Pagination::new(page, limit, total as u64);
    Ok((
        StatusCode::OK,
        success_with_msg("获取成功", PaginatedResponse { items, pagination }),
    ))
}

#[axum::debug_handler]
pub async fn approve_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let article = Article::set_status(&state.pool, id, status::APPROVED)
        .await?
        .ok_or_else(|| AppError::NotFound("文章不存在".to_string()))?;

    info!("article approved: {}", article.id);
    Ok((StatusCode::OK, success_with_msg("文章已通过审核", article)))
}

#[axum::debug_handler]
pub async fn reject_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let article = Article::set_status(&state.pool, id, status::REJECTED)
        .await?
        .ok_or_else(|| AppError::NotFound("文章不存在".to_string()))?;

    info!("article rejected: {}", article.id);
    Ok((StatusCode::OK, success_with_msg("文章已拒绝", article)))
}
