use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::info;

use crate::error::AppError;
use crate::routes::challenges::model::{Challenge, CreateChallengeRequest};
use crate::utils::success_with_msg;
use crate::AppState;

#[axum::debug_handler]
pub async fn get_challenges(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let challenges = Challenge::list(&state.pool).await?;
    Ok((StatusCode::OK, success_with_msg("获取成功", challenges)))
}

#[axum::debug_handler]
pub async fn create_challenge(
    State(state): State<AppState>,
    Json(req): Json<CreateChallengeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.description.trim().is_empty() {
        return Err(AppError::Validation("挑战描述不能为空".to_string()));
    }
    if req.condition.trim().is_empty() {
        return Err(AppError::Validation("完成条件不能为空".to_string()));
    }
    if req.points < 0 {
        return Err(AppError::Validation("积分不能为负".to_string()));
    }

    let challenge = Challenge::create(
        &state.pool,
        req.description.trim(),
        req.points,
        req.condition.trim(),
        req.icon.as_deref(),
    )
    .await?;
    info!("challenge created: {}", challenge.id);

    Ok((
        StatusCode::CREATED,
        success_with_msg("挑战已创建", challenge),
    ))
}
