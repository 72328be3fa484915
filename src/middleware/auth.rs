use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};

use crate::{
    AppState,
    error::AppError,
    utils::{self, Claims, roles},
};

/// 解析 Authorization 头中的 Bearer 令牌,校验通过后把 Claims 注入请求扩展
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let claims = utils::verify_token(token, &state.config).map_err(|err| {
        tracing::debug!("token verification failed: {}", err);
        AppError::Unauthorized
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// 审核类接口的角色守卫,依赖 auth_middleware 先写入 Claims
pub async fn require_staff(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let allowed = req
        .extensions()
        .get::<Claims>()
        .map(|c| roles::is_staff(&c.role))
        .unwrap_or(false);

    if !allowed {
        return Err(AppError::Forbidden);
    }
    Ok(next.run(req).await)
}
