use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProgressRequest {
    pub task_completed: String,
    pub points_earned: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRewardRequest {
    pub reward_id: Uuid,
}

#[derive(Debug, FromRow)]
pub struct Progress {
    pub user_id: Uuid,
    pub points: i64,
    pub tasks_completed: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub points: i64,
    pub tasks_completed: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

impl From<Progress> for ProgressView {
    fn from(p: Progress) -> Self {
        ProgressView {
            points: p.points,
            tasks_completed: p.tasks_completed,
            last_updated: p.last_updated,
        }
    }
}

#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: Uuid,
    pub description: String,
    pub points_required: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRewardResponse {
    /// 兑换后剩余积分
    pub points: i64,
}

impl Progress {
    pub async fn find(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Progress>(
            r#"
            SELECT user_id, points, tasks_completed, last_updated
            FROM progress
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// 加分和追加任务放在一条upsert里,并发提交不会互相覆盖
    pub async fn record_task(
        pool: &PgPool,
        user_id: Uuid,
        task: &str,
        points: i64,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Progress>(
            r#"
            INSERT INTO progress (user_id, points, tasks_completed, last_updated)
            VALUES ($1, $3, ARRAY[$2], NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET points = progress.points + EXCLUDED.points,
                tasks_completed = array_append(progress.tasks_completed, $2),
                last_updated = NOW()
            RETURNING user_id, points, tasks_completed, last_updated
            "#,
        )
        .bind(user_id)
        .bind(task)
        .bind(points)
        .fetch_one(pool)
        .await
    }

    /// 条件扣分,积分不足或没有进度记录时不改任何行
    pub async fn claim(
        pool: &PgPool,
        user_id: Uuid,
        points_required: i64,
    ) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE progress
            SET points = points - $2, last_updated = NOW()
            WHERE user_id = $1 AND points >= $2
            RETURNING points
            "#,
        )
        .bind(user_id)
        .bind(points_required)
        .fetch_optional(pool)
        .await
    }
}

impl Reward {
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Reward>(
            "SELECT id, description, points_required FROM rewards ORDER BY points_required ASC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Reward>(
            "SELECT id, description, points_required FROM rewards WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
