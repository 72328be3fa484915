use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::services::content::{FeedArticle, FeedVideo};

/// 抓取来的文章缺正文或作者时落库用的占位值
const DEFAULT_ARTICLE_CONTENT: &str = "内容暂缺";
const DEFAULT_ARTICLE_AUTHOR: &str = "佚名";

pub mod status {
    pub const PENDING: &str = "pending";
    pub const APPROVED: &str = "approved";
    pub const REJECTED: &str = "rejected";
}

pub mod video_categories {
    pub const MEDITATION: &str = "冥想";
    pub const RELAXATION: &str = "放松";
    pub const HEALTH: &str = "健康";

    pub fn is_valid(category: &str) -> bool {
        matches!(category, MEDITATION | RELAXATION | HEALTH)
    }
}

#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author: String,
    pub url: String,
    pub source: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub thumbnail: Option<String>,
    pub channel_name: Option<String>,
    pub status: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

impl Article {
    pub async fn list_approved(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Article>(
            r#"
            SELECT id, title, content, author, url, source, status, created_at
            FROM articles
            WHERE status = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(status::APPROVED)
        .fetch_all(pool)
        .await
    }

    pub async fn page_pending(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Article>(
            r#"
            SELECT id, title, content, author, url, source, status, created_at
            FROM articles
            WHERE status = $1
            ORDER BY created_at ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status::PENDING)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn count_pending(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM articles WHERE status = $1")
            .bind(status::PENDING)
            .fetch_one(pool)
            .await
    }

    /// 改状态,不存在返回None
    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        new_status: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Article>(
            r#"
            UPDATE articles SET status = $2
            WHERE id = $1
            RETURNING id, title, content, author, url, source, status, created_at
            "#,
        )
        .bind(id)
        .bind(new_status)
        .fetch_optional(pool)
        .await
    }

    /// 以url去重入库,重复的静默跳过
    pub async fn insert_pending(pool: &PgPool, article: &FeedArticle) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO articles (title, content, author, url, source)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (url) DO NOTHING
            "#,
        )
        .bind(&article.title)
        .bind(article.content.as_deref().unwrap_or(DEFAULT_ARTICLE_CONTENT))
        .bind(article.author.as_deref().unwrap_or(DEFAULT_ARTICLE_AUTHOR))
        .bind(&article.url)
        .bind(&article.source)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// 清理任务:删掉早于截止时间的已拒绝文章
    pub async fn delete_rejected_before(
        pool: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM articles WHERE status = $1 AND created_at < $2")
            .bind(status::REJECTED)
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

impl Video {
    /// 已上线的视频,可按分类过滤
    pub async fn list_approved(
        pool: &PgPool,
        category: Option<&str>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Video>(
            r#"
            SELECT id, title, description, url, thumbnail, channel_name, status, category, created_at
            FROM videos
            WHERE status = $1
              AND ($2::text IS NULL OR category = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(status::APPROVED)
        .bind(category)
        .fetch_all(pool)
        .await
    }

    pub async fn page_pending(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Video>(
            r#"
            SELECT id, title, description, url, thumbnail, channel_name, status, category, created_at
            FROM videos
            WHERE status = $1
            ORDER BY created_at ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status::PENDING)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn count_pending(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM videos WHERE status = $1")
            .bind(status::PENDING)
            .fetch_one(pool)
            .await
    }

    /// 过审时一并落定分类
    pub async fn approve(
        pool: &PgPool,
        id: Uuid,
        category: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Video>(
            r#"
            UPDATE videos SET status = $2, category = $3
            WHERE id = $1
            RETURNING id, title, description, url, thumbnail, channel_name, status, category, created_at
            "#,
        )
        .bind(id)
        .bind(status::APPROVED)
        .bind(category)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        new_status: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Video>(
            r#"
            UPDATE videos SET status = $2
            WHERE id = $1
            RETURNING id, title, description, url, thumbnail, channel_name, status, category, created_at
            "#,
        )
        .bind(id)
        .bind(new_status)
        .fetch_optional(pool)
        .await
    }

    pub async fn insert_pending(pool: &PgPool, video: &FeedVideo) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO videos (title, description, url, thumbnail, channel_name)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (url) DO NOTHING
            "#,
        )
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.url)
        .bind(&video.thumbnail)
        .bind(&video.channel_name)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn delete_rejected_before(
        pool: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM videos WHERE status = $1 AND created_at < $2")
            .bind(status::REJECTED)
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_video_categories_are_accepted() {
        assert!(video_categories::is_valid("冥想"));
        assert!(video_categories::is_valid("放松"));
        assert!(video_categories::is_valid("健康"));
    }

    #[test]
    fn unknown_video_categories_are_rejected() {
        assert!(!video_categories::is_valid("游戏"));
        assert!(!video_categories::is_valid(""));
        assert!(!video_categories::is_valid("meditation"));
    }
}
