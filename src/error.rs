use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::common::ApiResponse;
use crate::utils::error_codes;

/// 统一的业务错误类型,handler 直接返回 Result<_, AppError>
#[derive(Debug)]
pub enum AppError {
    /// 请求参数不合法
    Validation(String),
    /// 邮箱已被注册
    UserExists,
    /// 登录凭证错误(不区分邮箱不存在和密码错误)
    AuthFailed,
    /// 未携带或携带了无效的令牌
    Unauthorized,
    /// 已认证但权限不足
    Forbidden,
    /// 资源不存在
    NotFound(String),
    /// 验证码尝试次数过多,账号暂时锁定
    Locked,
    /// 验证码已过期或尚未申请
    CodeExpired,
    /// 上游服务不可用
    ProviderUnavailable(String),
    /// 数据库错误
    Database(sqlx::Error),
    /// 其他内部错误
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err)
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("bcrypt failure: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::Internal(format!("jwt failure: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ProviderUnavailable(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, msg) = match self {
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR, msg)
            }
            AppError::UserExists => (
                StatusCode::BAD_REQUEST,
                error_codes::USER_EXISTS,
                "该邮箱已被注册".to_string(),
            ),
            AppError::AuthFailed => (
                StatusCode::UNAUTHORIZED,
                error_codes::AUTH_FAILED,
                "邮箱或密码错误".to_string(),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                error_codes::AUTH_FAILED,
                "未授权访问".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                error_codes::PERMISSION_DENIED,
                "权限不足".to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND, msg),
            AppError::Locked => (
                StatusCode::LOCKED,
                error_codes::ACCOUNT_LOCKED,
                "尝试次数过多,请稍后再试".to_string(),
            ),
            AppError::CodeExpired => (
                StatusCode::BAD_REQUEST,
                error_codes::CODE_EXPIRED,
                "验证码已过期,请重新获取".to_string(),
            ),
            AppError::ProviderUnavailable(detail) => {
                tracing::error!("upstream service failure: {}", detail);
                (
                    StatusCode::BAD_GATEWAY,
                    error_codes::PROVIDER_UNAVAILABLE,
                    "外部服务暂不可用,请稍后再试".to_string(),
                )
            }
            AppError::Database(err) => {
                tracing::error!("database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_codes::INTERNAL_ERROR,
                    "内部服务器错误".to_string(),
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_codes::INTERNAL_ERROR,
                    "内部服务器错误".to_string(),
                )
            }
        };

        let body = Json(ApiResponse::<()> {
            code,
            msg,
            resp_data: None,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_maps_to_http_423() {
        let resp = AppError::Locked.into_response();
        assert_eq!(resp.status(), StatusCode::LOCKED);
    }

    #[test]
    fn provider_failure_maps_to_http_502() {
        let resp = AppError::ProviderUnavailable("timeout".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn validation_keeps_caller_message() {
        let resp = AppError::Validation("坐标不合法".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
