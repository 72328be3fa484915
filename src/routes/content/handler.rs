use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::error::AppError;
use crate::routes::content::model::{Article, Video};
use crate::utils::success_with_msg;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct VideosQuery {
    pub category: Option<String>,
}

/// 科普文章列表,只出已过审的
#[axum::debug_handler]
pub async fn get_articles(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let articles = Article::list_approved(&state.pool).await?;
    Ok((StatusCode::OK, success_with_msg("获取成功", articles)))
}

/// 练习视频列表,支持按分类过滤
#[axum::debug_handler]
pub async fn get_videos(
    State(state): State<AppState>,
    Query(query): Query<VideosQuery>,
) -> Result<impl IntoResponse, AppError> {
    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let videos = Video::list_approved(&state.pool, category).await?;
    Ok((StatusCode::OK, success_with_msg("获取成功", videos)))
}
