use axum::extract::{Extension, Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::common::EmptyResponse;
use crate::error::AppError;
use crate::routes::auth::model::{
    reaches_lock_threshold, ForgotPasswordRequest, LoginRequest, ProfileChanges, ProfileResponse,
    ResetGate, ResetPasswordRequest, TokenInfo, TokenResponse, UploadResponse, User,
    VerifyCodeRequest, RESET_CODE_TTL_MINUTES,
};
use crate::services::{email, media};
use crate::utils::forms::read_multipart_form;
use crate::utils::{
    generate_reset_code, generate_token, hash_password, is_valid_email, is_valid_reset_code,
    normalize_email, parse_user_id, roles, success_with_msg, verify_password, Claims,
};
use crate::AppState;

const MIN_PASSWORD_LEN: usize = 6;
const MAX_CUSTOM_EMOJIS: usize = 6;

/// 忘记密码接口对存在与否一律返回同样的提示,避免账号枚举
const RESET_GENERIC_MSG: &str = "如果该邮箱已注册,验证码将发送到您的邮箱";

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut form = read_multipart_form(&mut multipart).await?;

    let name = form.require("name", "姓名不能为空")?;
    let email = normalize_email(&form.require("email", "邮箱不能为空")?);
    if !is_valid_email(&email) {
        return Err(AppError::Validation("邮箱格式不正确".to_string()));
    }
    let password = form.require("password", "密码不能为空")?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation("密码长度至少为6位".to_string()));
    }
    let confirmation = form.require("passwordConfirmation", "请再次输入密码")?;
    if password != confirmation {
        return Err(AppError::Validation("两次输入的密码不一致".to_string()));
    }
    let phone = form.require("phone", "手机号不能为空")?;
    let role = match form.take("role") {
        None => roles::USER.to_string(),
        Some(r) if roles::is_valid(&r) => r,
        Some(_) => return Err(AppError::Validation("角色不合法".to_string())),
    };

    let photo_url = match form.image.take() {
        Some((filename, bytes)) => {
            Some(media::upload_image(&state.http, &state.config, bytes, &filename).await?)
        }
        None => None,
    };

    let password_hash = hash_password(&password)?;
    let user = match User::create(
        &state.pool,
        &name,
        &email,
        &password_hash,
        &phone,
        &role,
        photo_url.as_deref(),
    )
    .await
    {
        Ok(user) => user,
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            return Err(AppError::UserExists);
        }
        Err(e) => return Err(e.into()),
    };

    info!("user registered: {}", user.id);
    let (token, expires_at) = generate_token(&user.id.to_string(), &user.role, &state.config)?;
    Ok((
        StatusCode::OK,
        success_with_msg("注册成功", TokenResponse { token, expires_at }),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&req.email);
    // 账号不存在和密码错误返回同一个错误,不暴露哪个环节失败
    let user = User::find_by_email(&state.pool, &email)
        .await?
        .ok_or(AppError::AuthFailed)?;
    if !verify_password(&req.password, &user.password_hash)? {
        return Err(AppError::AuthFailed);
    }

    info!("user logged in: {}", user.id);
    let (token, expires_at) = generate_token(&user.id.to_string(), &user.role, &state.config)?;
    Ok((
        StatusCode::OK,
        success_with_msg("登录成功", TokenResponse { token, expires_at }),
    ))
}

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_user_id(&claims)?;
    let user = User::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("用户不存在".to_string()))?;
    Ok((
        StatusCode::OK,
        success_with_msg("获取成功", ProfileResponse::from(user)),
    ))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_user_id(&claims)?;
    let mut form = read_multipart_form(&mut multipart).await?;

    let current = User::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("用户不存在".to_string()))?;

    let mut changes = ProfileChanges {
        name: form.take("name"),
        bio: form.take("bio"),
        phone: form.take("phone"),
        device_token: form.take("deviceToken"),
        ..ProfileChanges::default()
    };

    if let Some(raw) = form.take("customEmojis") {
        let emojis: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if emojis.len() > MAX_CUSTOM_EMOJIS {
            return Err(AppError::Validation("最多自定义6个表情".to_string()));
        }
        changes.custom_emojis = Some(emojis);
    }

    if let Some(email) = form.take("email") {
        let email = normalize_email(&email);
        if !is_valid_email(&email) {
            return Err(AppError::Validation("邮箱格式不正确".to_string()));
        }
        if email != current.email {
            changes.email = Some(email);
        }
    }

    // 改密码必须先验证当前密码
    if let Some(new_password) = form.take("newPassword") {
        let current_password = form
            .take("password")
            .ok_or_else(|| AppError::Validation("修改密码需要提供当前密码".to_string()))?;
        if !verify_password(&current_password, &current.password_hash)? {
            return Err(AppError::Validation("当前密码不正确".to_string()));
        }
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation("密码长度至少为6位".to_string()));
        }
        changes.password_hash = Some(hash_password(&new_password)?);
    }

    if let Some((filename, bytes)) = form.image.take() {
        changes.photo_url =
            Some(media::upload_image(&state.http, &state.config, bytes, &filename).await?);
    }

    let updated = match User::update_profile(&state.pool, user_id, changes).await {
        Ok(user) => user,
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            return Err(AppError::UserExists);
        }
        Err(e) => return Err(e.into()),
    };

    info!("profile updated: {}", updated.id);
    Ok((
        StatusCode::OK,
        success_with_msg("资料已更新", ProfileResponse::from(updated)),
    ))
}

#[axum::debug_handler]
pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_user_id(&claims)?;
    let mut form = read_multipart_form(&mut multipart).await?;
    let (filename, bytes) = form
        .image
        .take()
        .ok_or_else(|| AppError::Validation("缺少图片文件".to_string()))?;

    let url = media::upload_image(&state.http, &state.config, bytes, &filename).await?;
    User::update_photo(&state.pool, user_id, &url).await?;

    info!("avatar uploaded: {}", user_id);
    Ok((
        StatusCode::OK,
        success_with_msg("头像已更新", UploadResponse { photo_url: url }),
    ))
}

#[axum::debug_handler]
pub async fn validate_token(Extension(claims): Extension<Claims>) -> impl IntoResponse {
    (
        StatusCode::OK,
        success_with_msg(
            "令牌有效",
            TokenInfo {
                user_id: claims.sub,
                role: claims.role,
                expires_at: claims.exp,
            },
        ),
    )
}

#[axum::debug_handler]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        return Err(AppError::Validation("邮箱格式不正确".to_string()));
    }

    let user = match User::find_by_email(&state.pool, &email).await? {
        Some(user) => user,
        None => {
            return Ok((
                StatusCode::OK,
                success_with_msg(RESET_GENERIC_MSG, EmptyResponse {}),
            ));
        }
    };

    // 新验证码覆盖旧的并清零计数,但不解除进行中的锁定
    let code = generate_reset_code();
    let code_hash = hash_password(&code)?;
    let expires_at = Utc::now() + Duration::minutes(RESET_CODE_TTL_MINUTES);
    User::issue_reset_code(&state.pool, user.id, &code_hash, expires_at).await?;

    if let Err(e) = email::send_password_reset_email(&state.http, &state.config, &user.email, &code).await
    {
        // 发信失败不向调用方暴露,留给用户重新请求
        warn!("failed to send reset email for user {}: {:?}", user.id, e);
    } else {
        info!("reset code issued for user {}", user.id);
    }

    Ok((
        StatusCode::OK,
        success_with_msg(RESET_GENERIC_MSG, EmptyResponse {}),
    ))
}

/// 门控通过后做哈希比对;失败计一次,锁定和过期都不计
async fn check_reset_code(state: &AppState, user: &User, code: &str) -> Result<(), AppError> {
    if !is_valid_reset_code(code) {
        return Err(AppError::Validation("验证码不正确".to_string()));
    }

    let now = Utc::now();
    match user.reset_gate(now) {
        ResetGate::Locked => Err(AppError::Locked),
        ResetGate::Expired => Err(AppError::CodeExpired),
        ResetGate::ReadyToVerify => {
            let hash = match user.reset_code_hash.as_deref() {
                Some(hash) => hash,
                None => return Err(AppError::CodeExpired),
            };
            if verify_password(code, hash)? {
                Ok(())
            } else {
                let attempts =
                    User::record_failed_reset_attempt(&state.pool, user.id, now).await?;
                if reaches_lock_threshold(attempts) {
                    warn!("reset attempts exhausted for user {}", user.id);
                }
                Err(AppError::Validation("验证码不正确".to_string()))
            }
        }
    }
}

#[axum::debug_handler]
pub async fn verify_code(
    State(state): State<AppState>,
    Json(req): Json<VerifyCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        return Err(AppError::Validation("邮箱格式不正确".to_string()));
    }

    // 未注册邮箱和验证码错误给同一个提示
    let user = User::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| AppError::Validation("验证码不正确".to_string()))?;

    check_reset_code(&state, &user, &req.code).await?;
    User::clear_reset_attempts(&state.pool, user.id).await?;

    Ok((
        StatusCode::OK,
        success_with_msg(
            "验证码验证成功,您现在可以重置密码",
            EmptyResponse {},
        ),
    ))
}

#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        return Err(AppError::Validation("邮箱格式不正确".to_string()));
    }
    if req.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation("密码长度至少为6位".to_string()));
    }

    let user = User::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| AppError::Validation("验证码不正确".to_string()))?;

    check_reset_code(&state, &user, &req.code).await?;

    let password_hash = hash_password(&req.new_password)?;
    User::complete_password_reset(&state.pool, user.id, &password_hash).await?;

    info!("password reset completed for user {}", user.id);
    Ok((
        StatusCode::OK,
        success_with_msg("密码重置成功", EmptyResponse {}),
    ))
}
