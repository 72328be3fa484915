use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::info;

use crate::error::AppError;
use crate::routes::gamification::model::{
    ClaimRewardRequest, ClaimRewardResponse, Progress, ProgressView, Reward,
    UpdateProgressRequest,
};
use crate::utils::{parse_user_id, success_with_msg, Claims};
use crate::AppState;

#[axum::debug_handler]
pub async fn get_progress(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_user_id(&claims)?;
    let progress = Progress::find(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("暂无进度记录".to_string()))?;
    Ok((
        StatusCode::OK,
        success_with_msg("获取成功", ProgressView::from(progress)),
    ))
}

#[axum::debug_handler]
pub async fn update_progress(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_user_id(&claims)?;
    if req.task_completed.trim().is_empty() {
        return Err(AppError::Validation("任务名称不能为空".to_string()));
    }
    if req.points_earned < 0 {
        return Err(AppError::Validation("积分不能为负".to_string()));
    }

    let progress = Progress::record_task(
        &state.pool,
        user_id,
        req.task_completed.trim(),
        req.points_earned,
    )
    .await?;
    info!(
        "progress updated: user {} now has {} points",
        user_id, progress.points
    );

    Ok((
        StatusCode::OK,
        success_with_msg("进度已更新", ProgressView::from(progress)),
    ))
}

#[axum::debug_handler]
pub async fn get_rewards(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let rewards = Reward::list(&state.pool).await?;
    Ok((StatusCode::OK, success_with_msg("获取成功", rewards)))
}

#[axum::debug_handler]
pub async fn claim_reward(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ClaimRewardRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_user_id(&claims)?;
    let reward = Reward::find(&state.pool, req.reward_id)
        .await?
        .ok_or_else(|| AppError::NotFound("奖励不存在".to_string()))?;

    // 扣分条件写在SQL里,两个并发兑换不会把积分扣成负数
    let points = Progress::claim(&state.pool, user_id, reward.points_required)
        .await?
        .ok_or_else(|| AppError::Validation("积分不足,无法兑换该奖励".to_string()))?;

    info!(
        "reward {} claimed by {}, {} points left",
        reward.id, user_id, points
    );
    Ok((
        StatusCode::OK,
        success_with_msg("兑换成功", ClaimRewardResponse { points }),
    ))
}
