use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateChallengeRequest {
    pub description: String,
    pub points: i64,
    pub condition: String,
    pub icon: Option<String>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct Challenge {
    pub id: Uuid,
    pub description: String,
    pub points: i64,
    pub condition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Challenge {
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Challenge>(
            "SELECT id, description, points, condition, icon FROM challenges ORDER BY points ASC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn create(
        pool: &PgPool,
        description: &str,
        points: i64,
        condition: &str,
        icon: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Challenge>(
            r#"
            INSERT INTO challenges (description, points, condition, icon)
            VALUES ($1, $2, $3, $4)
            RETURNING id, description, points, condition, icon
            "#,
        )
        .bind(description)
        .bind(points)
        .bind(condition)
        .bind(icon)
        .fetch_one(pool)
        .await
    }
}
