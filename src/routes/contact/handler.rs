use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::common::EmptyResponse;
use crate::error::AppError;
use crate::services::email;
use crate::utils::{is_valid_email, normalize_email, success_with_msg};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SupportRequest {
    pub name: Option<String>,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

/// 求助信转发到支持邮箱,发信失败直接告知用户稍后再试
#[axum::debug_handler]
pub async fn send_support_message(
    State(state): State<AppState>,
    Json(req): Json<SupportRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.message.trim().is_empty() {
        return Err(AppError::Validation("邮箱和留言内容不能为空".to_string()));
    }
    if !is_valid_email(&email) {
        return Err(AppError::Validation("邮箱格式不正确".to_string()));
    }

    email::send_support_email(
        &state.http,
        &state.config,
        req.name.as_deref(),
        &email,
        req.subject.as_deref(),
        req.message.trim(),
    )
    .await?;

    info!("support message relayed from {}", email);
    Ok((
        StatusCode::OK,
        success_with_msg("您的留言已送达,我们会尽快回复", EmptyResponse {}),
    ))
}
