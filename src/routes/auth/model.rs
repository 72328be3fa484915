use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

pub const MAX_RESET_ATTEMPTS: i32 = 5;
pub const RESET_CODE_TTL_MINUTES: i64 = 10;
pub const RESET_LOCK_MINUTES: i64 = 15;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub role: String,
    pub device_token: Option<String>,
    pub custom_emojis: Vec<String>,
    pub reset_code_hash: Option<String>,
    pub reset_code_expires_at: Option<DateTime<Utc>>,
    pub reset_attempts: i32,
    pub reset_locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub role: String,
    pub custom_emojis: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        ProfileResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            bio: user.bio,
            photo_url: user.photo_url,
            role: user.role,
            custom_emojis: user.custom_emojis,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub photo_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub user_id: String,
    pub role: String,
    pub expires_at: i64,
}

/// 资料更新的变更集,None 表示该字段不动
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub device_token: Option<String>,
    pub custom_emojis: Option<Vec<String>>,
    pub password_hash: Option<String>,
    pub photo_url: Option<String>,
}

/// 验证码校验前的状态判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetGate {
    /// 锁定期内,一律拒绝且不计入尝试次数
    Locked,
    /// 没有有效验证码(从未申请、已用掉或已过期)
    Expired,
    /// 可以进入哈希比对
    ReadyToVerify,
}

/// 纯函数的门控判定,锁定优先于过期,过期优先于比对。
/// 正确的验证码在锁定期内同样被拒绝。
pub fn evaluate_reset_gate(
    code_hash: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
    locked_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> ResetGate {
    if locked_until.map(|t| t > now).unwrap_or(false) {
        return ResetGate::Locked;
    }
    let usable = code_hash.is_some() && expires_at.map(|t| t >= now).unwrap_or(false);
    if usable {
        ResetGate::ReadyToVerify
    } else {
        ResetGate::Expired
    }
}

/// 连续失败达到上限即触发锁定
pub fn reaches_lock_threshold(attempts: i32) -> bool {
    attempts >= MAX_RESET_ATTEMPTS
}

impl User {
    pub fn reset_gate(&self, now: DateTime<Utc>) -> ResetGate {
        evaluate_reset_gate(
            self.reset_code_hash.as_deref(),
            self.reset_code_expires_at,
            self.reset_locked_until,
            now,
        )
    }

    pub async fn create(
        pool: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
        phone: &str,
        role: &str,
        photo_url: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, phone, role, photo_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, email, password_hash, phone, bio, photo_url, role,
                      device_token, custom_emojis, reset_code_hash, reset_code_expires_at,
                      reset_attempts, reset_locked_until, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(phone)
        .bind(role)
        .bind(photo_url)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, phone, bio, photo_url, role,
                   device_token, custom_emojis, reset_code_hash, reset_code_expires_at,
                   reset_attempts, reset_locked_until, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, phone, bio, photo_url, role,
                   device_token, custom_emojis, reset_code_hash, reset_code_expires_at,
                   reset_attempts, reset_locked_until, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// 单条UPDATE配合COALESCE,没传的字段保持原值
    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                bio = COALESCE($3, bio),
                phone = COALESCE($4, phone),
                email = COALESCE($5, email),
                device_token = COALESCE($6, device_token),
                custom_emojis = COALESCE($7, custom_emojis),
                password_hash = COALESCE($8, password_hash),
                photo_url = COALESCE($9, photo_url)
            WHERE id = $1
            RETURNING id, name, email, password_hash, phone, bio, photo_url, role,
                      device_token, custom_emojis, reset_code_hash, reset_code_expires_at,
                      reset_attempts, reset_locked_until, created_at
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.bio)
        .bind(changes.phone)
        .bind(changes.email)
        .bind(changes.device_token)
        .bind(changes.custom_emojis)
        .bind(changes.password_hash)
        .bind(changes.photo_url)
        .fetch_one(pool)
        .await
    }

    pub async fn update_photo(pool: &PgPool, id: Uuid, url: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET photo_url = $2 WHERE id = $1")
            .bind(id)
            .bind(url)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// 下发新验证码:重置尝试计数,但不解除已有的锁定
    pub async fn issue_reset_code(
        pool: &PgPool,
        id: Uuid,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_code_hash = $2, reset_code_expires_at = $3, reset_attempts = 0
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(code_hash)
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// 失败计数的自增和触发锁定放在同一条语句里,并发请求下不会丢计数
    pub async fn record_failed_reset_attempt(
        pool: &PgPool,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<i32, sqlx::Error> {
        let lock_until = now + Duration::minutes(RESET_LOCK_MINUTES);
        sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE users
            SET reset_attempts = reset_attempts + 1,
                reset_locked_until = CASE
                    WHEN reset_attempts + 1 >= $2 THEN $3
                    ELSE reset_locked_until
                END
            WHERE id = $1
            RETURNING reset_attempts
            "#,
        )
        .bind(id)
        .bind(MAX_RESET_ATTEMPTS)
        .bind(lock_until)
        .fetch_one(pool)
        .await
    }

    pub async fn clear_reset_attempts(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET reset_attempts = 0 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// 重置成功后一次性写入新密码并清空全部重置状态
    pub async fn complete_password_reset(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2,
                reset_code_hash = NULL,
                reset_code_expires_at = NULL,
                reset_attempts = 0,
                reset_locked_until = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// 后台任务:清掉过期未使用的验证码状态
    pub async fn clear_expired_reset_codes(
        pool: &PgPool,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET reset_code_hash = NULL, reset_code_expires_at = NULL, reset_attempts = 0
            WHERE reset_code_expires_at IS NOT NULL AND reset_code_expires_at < $1
            "#,
        )
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn cleared_state_is_expired() {
        assert_eq!(
            evaluate_reset_gate(None, None, None, at(12, 0)),
            ResetGate::Expired
        );
    }

    #[test]
    fn active_code_is_ready_to_verify() {
        assert_eq!(
            evaluate_reset_gate(Some("$2b$hash"), Some(at(12, 10)), None, at(12, 0)),
            ResetGate::ReadyToVerify
        );
    }

    #[test]
    fn past_expiry_is_expired() {
        assert_eq!(
            evaluate_reset_gate(Some("$2b$hash"), Some(at(11, 49)), None, at(12, 0)),
            ResetGate::Expired
        );
    }

    #[test]
    fn expiry_boundary_is_still_usable() {
        // 恰好到期的那一刻仍可用,和线上行为保持一致
        assert_eq!(
            evaluate_reset_gate(Some("$2b$hash"), Some(at(12, 0)), None, at(12, 0)),
            ResetGate::ReadyToVerify
        );
    }

    #[test]
    fn lock_wins_over_valid_code() {
        // 锁定期内就算验证码有效也必须拒绝
        assert_eq!(
            evaluate_reset_gate(Some("$2b$hash"), Some(at(12, 10)), Some(at(12, 5)), at(12, 0)),
            ResetGate::Locked
        );
    }

    #[test]
    fn lock_wins_over_expired_code() {
        assert_eq!(
            evaluate_reset_gate(None, None, Some(at(12, 5)), at(12, 0)),
            ResetGate::Locked
        );
    }

    #[test]
    fn lock_boundary_releases_exactly_at_deadline() {
        assert_eq!(
            evaluate_reset_gate(Some("$2b$hash"), Some(at(12, 10)), Some(at(12, 0)), at(12, 0)),
            ResetGate::ReadyToVerify
        );
    }

    #[test]
    fn expired_lock_is_ignored() {
        assert_eq!(
            evaluate_reset_gate(Some("$2b$hash"), Some(at(12, 10)), Some(at(11, 0)), at(12, 0)),
            ResetGate::ReadyToVerify
        );
    }

    #[test]
    fn missing_hash_with_future_expiry_is_expired() {
        assert_eq!(
            evaluate_reset_gate(None, Some(at(12, 10)), None, at(12, 0)),
            ResetGate::Expired
        );
    }

    #[test]
    fn lock_threshold_at_five_attempts() {
        assert!(!reaches_lock_threshold(4));
        assert!(reaches_lock_threshold(5));
        assert!(reaches_lock_threshold(6));
    }
}
