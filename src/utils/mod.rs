use axum::Json;
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::common::ApiResponse;
use crate::config::Config;
use crate::error::AppError;

pub mod forms;
pub mod geo;

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // 用户ID
    pub role: String, // 用户角色
    pub exp: i64,     // 过期时间
    pub iat: i64,     // 签发时间
}

pub fn generate_token(
    user_id: &str,
    role: &str,
    config: &Config,
) -> Result<(String, i64), jsonwebtoken::errors::Error> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::seconds(config.jwt_expiration().as_secs() as i64))
        .expect("valid timestamp")
        .timestamp();

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: expiration,
        iat: Utc::now().timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;

    Ok((token, expiration))
}

pub fn verify_token(token: &str, config: &Config) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// 从令牌声明里取出用户ID,解析失败按未授权处理
pub fn parse_user_id(claims: &Claims) -> Result<uuid::Uuid, AppError> {
    uuid::Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)
}

/// 生成6位数字验证码
pub fn generate_reset_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// 验证码必须恰好6位数字
pub fn is_valid_reset_code(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

/// 宽松的邮箱格式校验,复杂规则交给邮件服务商
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > 254 || email.contains(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 相对时间展示,如"3分钟前"
pub fn time_ago(from: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - from).num_seconds().max(0);
    if secs < 60 {
        "刚刚".to_string()
    } else if secs < 3600 {
        format!("{}分钟前", secs / 60)
    } else if secs < 86400 {
        format!("{}小时前", secs / 3600)
    } else if secs < 86400 * 30 {
        format!("{}天前", secs / 86400)
    } else {
        format!("{}个月前", secs / (86400 * 30))
    }
}

pub mod roles {
    pub const USER: &str = "user";
    pub const MODERATOR: &str = "moderator";
    pub const ADMIN: &str = "admin";

    pub fn is_valid(role: &str) -> bool {
        matches!(role, USER | MODERATOR | ADMIN)
    }

    /// 审核相关接口只对版主和管理员开放
    pub fn is_staff(role: &str) -> bool {
        matches!(role, MODERATOR | ADMIN)
    }
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: 0,
        msg: "success".into(),
        resp_data: Some(data),
    })
}

pub fn success_with_msg<T: Serialize>(msg: &str, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: 0,
        msg: msg.to_string(),
        resp_data: Some(data),
    })
}

pub fn error_to_api_response<T>(code: i32, msg: String) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code,
        msg,
        resp_data: None,
    })
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const USER_EXISTS: i32 = 1001;
    pub const AUTH_FAILED: i32 = 1002;
    pub const PERMISSION_DENIED: i32 = 1003;
    pub const NOT_FOUND: i32 = 1004;
    pub const RATE_LIMIT: i32 = 1005;
    pub const CODE_EXPIRED: i32 = 1006;
    pub const ACCOUNT_LOCKED: i32 = 1007;
    pub const PROVIDER_UNAVAILABLE: i32 = 1008;
    pub const INTERNAL_ERROR: i32 = 5000;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reset_code_is_six_digits() {
        for _ in 0..50 {
            let code = generate_reset_code();
            assert!(is_valid_reset_code(&code), "bad code: {}", code);
        }
    }

    #[test]
    fn reset_code_validation_rejects_malformed_input() {
        assert!(is_valid_reset_code("123456"));
        assert!(!is_valid_reset_code("12345"));
        assert!(!is_valid_reset_code("1234567"));
        assert!(!is_valid_reset_code("12345a"));
        assert!(!is_valid_reset_code("１２３４５６"));
        assert!(!is_valid_reset_code(""));
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.cn"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@nodot"));
        assert!(!is_valid_email("user @example.com"));
        assert!(!is_valid_email("user@.example.com"));
    }

    #[test]
    fn email_normalization_trims_and_lowercases() {
        assert_eq!(normalize_email("  User@Example.COM "), "user@example.com");
    }

    #[test]
    fn token_round_trip_preserves_claims() {
        let config = Config::test_default();
        let (token, exp) = generate_token("u-1", roles::MODERATOR, &config).unwrap();
        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.role, roles::MODERATOR);
        assert_eq!(claims.exp, exp);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let config = Config::test_default();
        let (token, _) = generate_token("u-1", roles::USER, &config).unwrap();
        let mut other = config.clone();
        other.jwt_secret = "different-secret".into();
        assert!(verify_token(&token, &other).is_err());
    }

    #[test]
    fn time_ago_buckets() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let cases = [
            (now - Duration::seconds(10), "刚刚"),
            (now - Duration::minutes(5), "5分钟前"),
            (now - Duration::hours(3), "3小时前"),
            (now - Duration::days(4), "4天前"),
            (now - Duration::days(65), "2个月前"),
        ];
        for (from, expected) in cases {
            assert_eq!(time_ago(from, now), expected);
        }
    }

    #[test]
    fn staff_roles() {
        assert!(roles::is_staff(roles::ADMIN));
        assert!(roles::is_staff(roles::MODERATOR));
        assert!(!roles::is_staff(roles::USER));
        assert!(!roles::is_staff("guest"));
    }
}
