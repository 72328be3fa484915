use std::env;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub server_host: String,
    pub server_port: u16,
    pub http_timeout_secs: u64,
    // 地图服务
    pub places_api_key: String,
    pub places_base_url: String,
    pub geo_search_radius_m: u32,
    pub geo_cache_ttl_secs: u64,
    pub geo_coord_precision: u32,
    pub geo_default_terms: Vec<String>,
    // 邮件
    pub email_api_key: String,
    pub email_api_url: String,
    pub email_from: String,
    pub support_inbox: String,
    // 推送
    pub push_server_key: String,
    pub push_api_url: String,
    // 图片存储
    pub media_upload_url: String,
    pub media_upload_preset: String,
    // 内容抓取
    pub news_api_key: String,
    pub news_api_url: String,
    pub video_api_key: String,
    pub video_api_url: String,
    // 后台清理任务
    pub cleanup_interval_secs: u64,
    pub cleanup_grace_days: i64,
}

/// 可选配置项:缺失或解析失败时退回默认值
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_or_str(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let jwt_expiration_hours: u64 = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.trim_end_matches('h').parse().ok())
            .unwrap_or(12);
        let default_terms = env_or_str("GEO_DEFAULT_TERMS", "心理咨询,心理医院,社区卫生服务中心")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            jwt_expiration_secs: jwt_expiration_hours * 3600,
            rate_limit_window_secs: env_or("RATE_LIMIT_WINDOW", 60),
            rate_limit_requests: env_or("RATE_LIMIT_REQUESTS", 100),
            server_host: env_or_str("SERVER_HOST", "0.0.0.0"),
            server_port: env_or("SERVER_PORT", 3000),
            http_timeout_secs: env_or("HTTP_TIMEOUT_SECS", 10),
            places_api_key: env::var("PLACES_API_KEY")?,
            places_base_url: env_or_str(
                "PLACES_BASE_URL",
                "https://maps.googleapis.com/maps/api/place",
            ),
            geo_search_radius_m: env_or("GEO_SEARCH_RADIUS_M", 5000),
            geo_cache_ttl_secs: env_or("GEO_CACHE_TTL_SECS", 21600),
            geo_coord_precision: env_or("GEO_COORD_PRECISION", 3),
            geo_default_terms: default_terms,
            email_api_key: env::var("EMAIL_API_KEY")?,
            email_api_url: env_or_str("EMAIL_API_URL", "https://api.sendgrid.com/v3/mail/send"),
            email_from: env::var("EMAIL_FROM")?,
            support_inbox: env::var("SUPPORT_INBOX")?,
            push_server_key: env::var("PUSH_SERVER_KEY")?,
            push_api_url: env_or_str("PUSH_API_URL", "https://fcm.googleapis.com/fcm/send"),
            media_upload_url: env::var("MEDIA_UPLOAD_URL")?,
            media_upload_preset: env::var("MEDIA_UPLOAD_PRESET")?,
            news_api_key: env::var("NEWS_API_KEY")?,
            news_api_url: env_or_str("NEWS_API_URL", "https://newsapi.org/v2/everything"),
            video_api_key: env::var("VIDEO_API_KEY")?,
            video_api_url: env_or_str(
                "VIDEO_API_URL",
                "https://www.googleapis.com/youtube/v3/search",
            ),
            cleanup_interval_secs: env_or("CLEANUP_INTERVAL_SECS", 86400),
            cleanup_grace_days: env_or("CLEANUP_GRACE_DAYS", 7),
        })
    }

    /// 单元测试用的固定配置,不读取环境变量
    #[cfg(test)]
    pub fn test_default() -> Self {
        Config {
            database_url: "postgres://localhost/test".into(),
            redis_url: "redis://localhost".into(),
            jwt_secret: "test-secret".into(),
            jwt_expiration_secs: 12 * 3600,
            rate_limit_window_secs: 60,
            rate_limit_requests: 100,
            server_host: "127.0.0.1".into(),
            server_port: 3000,
            http_timeout_secs: 10,
            places_api_key: "places-key".into(),
            places_base_url: "https://maps.googleapis.com/maps/api/place".into(),
            geo_search_radius_m: 5000,
            geo_cache_ttl_secs: 21600,
            geo_coord_precision: 3,
            geo_default_terms: vec![
                "心理咨询".into(),
                "心理医院".into(),
                "社区卫生服务中心".into(),
            ],
            email_api_key: "email-key".into(),
            email_api_url: "https://api.sendgrid.com/v3/mail/send".into(),
            email_from: "noreply@example.com".into(),
            support_inbox: "support@example.com".into(),
            push_server_key: "push-key".into(),
            push_api_url: "https://fcm.googleapis.com/fcm/send".into(),
            media_upload_url: "https://api.cloudinary.com/v1_1/demo/image/upload".into(),
            media_upload_preset: "unsigned".into(),
            news_api_key: "news-key".into(),
            news_api_url: "https://newsapi.org/v2/everything".into(),
            video_api_key: "video-key".into(),
            video_api_url: "https://www.googleapis.com/youtube/v3/search".into(),
            cleanup_interval_secs: 86400,
            cleanup_grace_days: 7,
        }
    }

    pub fn jwt_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_expiration_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}
