use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::error::AppError;
use crate::routes::diary::model::{CreateEntryRequest, DiaryEntry, DiaryEntryView, EntryFilter};
use crate::utils::{parse_user_id, success_with_msg, Claims};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EntriesQuery {
    pub filter: Option<String>,
}

#[axum::debug_handler]
pub async fn create_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateEntryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_user_id(&claims)?;
    if req.mood_emoji.trim().is_empty() {
        return Err(AppError::Validation("心情表情不能为空".to_string()));
    }
    if req.entry.trim().is_empty() {
        return Err(AppError::Validation("日记内容不能为空".to_string()));
    }

    let entry =
        DiaryEntry::create(&state.pool, user_id, req.mood_emoji.trim(), req.entry.trim()).await?;
    info!("diary entry created: {} by {}", entry.id, user_id);

    Ok((
        StatusCode::CREATED,
        success_with_msg("记录成功", DiaryEntryView::from(entry)),
    ))
}

#[axum::debug_handler]
pub async fn get_entries(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<EntriesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_user_id(&claims)?;

    // 未知的filter值按不筛选处理
    let since = query
        .filter
        .as_deref()
        .and_then(EntryFilter::parse)
        .map(|f| f.period_start(Utc::now()));

    let entries = DiaryEntry::list_for_user(&state.pool, user_id, since).await?;
    let items: Vec<DiaryEntryView> = entries.into_iter().map(Into::into).collect();
    Ok((StatusCode::OK, success_with_msg("获取成功", items)))
}
