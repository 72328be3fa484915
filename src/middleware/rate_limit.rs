use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use redis::AsyncCommands;

use crate::{
    config::Config,
    utils::{error_codes, error_to_api_response},
};

const RATE_KEY_PREFIX: &str = "rate:ip:";

/// 基于 Redis 固定窗口计数的限流器,按客户端IP计数
#[derive(Clone)]
pub struct RateLimiter {
    redis: Arc<redis::Client>,
    config: Arc<Config>,
}

/// 反向代理后面以 x-real-ip 为准,其次取 x-forwarded-for 链路里最外层的IP,
/// 都没有才退化到连接IP
fn client_ip(headers: &HeaderMap, remote: Option<&str>) -> String {
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|chain| chain.split(',').map(str::trim).find(|s| !s.is_empty()))
        })
        .or(remote)
        .unwrap_or("unknown")
        .to_string()
}

impl RateLimiter {
    pub fn new(redis: redis::Client, config: Config) -> Self {
        Self {
            redis: Arc::new(redis),
            config: Arc::new(config),
        }
    }

    /// 窗口内超限的请求直接拒绝。Redis不可用时放行,
    /// 限流器故障不应拖垮整个接口。
    pub async fn check_rate_limit(self: Arc<Self>, req: Request<Body>, next: Next) -> Response {
        let remote_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string());
        let ip = client_ip(req.headers(), remote_ip.as_deref());

        let window_secs = self.config.rate_limit_window().as_secs();
        match self.current_count(&ip, window_secs).await {
            Ok(count) if count > self.config.rate_limit_requests as i64 => {
                tracing::warn!("rate limit exceeded for ip {}", ip);
                (
                    StatusCode::OK,
                    error_to_api_response::<()>(
                        error_codes::RATE_LIMIT,
                        format!("请求过于频繁,请在{}秒后重试", window_secs),
                    ),
                )
                    .into_response()
            }
            Ok(_) => next.run(req).await,
            Err(e) => {
                tracing::warn!("rate limiter unavailable, letting request through: {}", e);
                next.run(req).await
            }
        }
    }

    /// INCR 计数,窗口首个请求时挂上过期时间
    async fn current_count(&self, ip: &str, window_secs: u64) -> Result<i64, redis::RedisError> {
        let key = format!("{}{}", RATE_KEY_PREFIX, ip);
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let count: i64 = conn.incr(&key, 1).await?;
        if count == 1 {
            let _: () = conn.expire(&key, window_secs as i64).await?;
        }
        Ok(count)
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    limiter.check_rate_limit(req, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn real_ip_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("203.0.113.9"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.1, 10.0.0.2"),
        );
        assert_eq!(client_ip(&headers, Some("127.0.0.1")), "203.0.113.9");
    }

    #[test]
    fn forwarded_chain_takes_first_non_empty_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" , 198.51.100.1, 10.0.0.2"),
        );
        assert_eq!(client_ip(&headers, Some("127.0.0.1")), "198.51.100.1");
    }

    #[test]
    fn falls_back_to_remote_then_unknown() {
        let headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some("192.0.2.7")), "192.0.2.7");
        assert_eq!(client_ip(&headers, None), "unknown");
    }

    #[test]
    fn blank_real_ip_header_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("  "));
        assert_eq!(client_ip(&headers, Some("192.0.2.7")), "192.0.2.7");
    }
}
