use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::utils::time_ago;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentRequest {
    pub post_id: Uuid,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikePostRequest {
    pub post_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorView {
    pub name: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub author: AuthorView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Uuid,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub time_ago: String,
    pub author: AuthorView,
    pub comments: Vec<CommentView>,
    pub like_count: i64,
    pub is_liked_by_current_user: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: Uuid,
    pub kind: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// 帖子连同作者信息的一行
#[derive(Debug, Clone, FromRow)]
pub struct PostAuthorRow {
    pub id: Uuid,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author_name: String,
    pub author_photo: Option<String>,
}

/// 评论连同评论人信息的一行
#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: Uuid,
    pub post_id: Uuid,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub author_name: String,
    pub author_photo: Option<String>,
}

#[derive(Debug, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub kind: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

pub struct Post;

impl Post {
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<PostAuthorRow, sqlx::Error> {
        sqlx::query_as::<_, PostAuthorRow>(
            r#"
            WITH inserted AS (
                INSERT INTO posts (user_id, content, image_url)
                VALUES ($1, $2, $3)
                RETURNING id, user_id, content, image_url, created_at
            )
            SELECT i.id, i.content, i.image_url, i.created_at,
                   u.name AS author_name, u.photo_url AS author_photo
            FROM inserted i
            JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(user_id)
        .bind(content)
        .bind(image_url)
        .fetch_one(pool)
        .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
            .fetch_one(pool)
            .await
    }

    /// 按创建时间倒序取一页,作者信息一并带出
    pub async fn page_with_authors(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostAuthorRow>, sqlx::Error> {
        sqlx::query_as::<_, PostAuthorRow>(
            r#"
            SELECT p.id, p.content, p.image_url, p.created_at,
                   u.name AS author_name, u.photo_url AS author_photo
            FROM posts p
            JOIN users u ON u.id = p.user_id
            ORDER BY p.created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// 帖子作者的ID和推送令牌,帖子不存在返回None
    pub async fn author_info(
        pool: &PgPool,
        post_id: Uuid,
    ) -> Result<Option<(Uuid, Option<String>)>, sqlx::Error> {
        sqlx::query_as::<_, (Uuid, Option<String>)>(
            r#"
            SELECT u.id, u.device_token
            FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE p.id = $1
            "#,
        )
        .bind(post_id)
        .fetch_optional(pool)
        .await
    }
}

pub struct Comment;

impl Comment {
    pub async fn create(
        pool: &PgPool,
        post_id: Uuid,
        user_id: Uuid,
        comment: &str,
    ) -> Result<CommentRow, sqlx::Error> {
        sqlx::query_as::<_, CommentRow>(
            r#"
            WITH inserted AS (
                INSERT INTO post_comments (post_id, user_id, comment)
                VALUES ($1, $2, $3)
                RETURNING id, post_id, user_id, comment, created_at
            )
            SELECT i.id, i.post_id, i.comment, i.created_at,
                   u.name AS author_name, u.photo_url AS author_photo
            FROM inserted i
            JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(comment)
        .fetch_one(pool)
        .await
    }

    /// 一批帖子的全部评论,按时间正序
    pub async fn for_posts(
        pool: &PgPool,
        post_ids: &[Uuid],
    ) -> Result<Vec<CommentRow>, sqlx::Error> {
        sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT c.id, c.post_id, c.comment, c.created_at,
                   u.name AS author_name, u.photo_url AS author_photo
            FROM post_comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.post_id = ANY($1)
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(post_ids)
        .fetch_all(pool)
        .await
    }
}

pub struct Like;

impl Like {
    /// 尝试点赞,已点过返回false
    pub async fn try_insert(
        pool: &PgPool,
        post_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO post_likes (post_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (post_id, user_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn remove(pool: &PgPool, post_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn count(pool: &PgPool, post_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM post_likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(pool)
            .await
    }

    /// 一批帖子的点赞数
    pub async fn counts_for_posts(
        pool: &PgPool,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i64>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (Uuid, i64)>(
            r#"
            SELECT post_id, COUNT(*)
            FROM post_likes
            WHERE post_id = ANY($1)
            GROUP BY post_id
            "#,
        )
        .bind(post_ids)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    /// 当前用户在这批帖子里点过赞的集合
    pub async fn liked_by_user(
        pool: &PgPool,
        post_ids: &[Uuid],
        user_id: Uuid,
    ) -> Result<HashSet<Uuid>, sqlx::Error> {
        let rows = sqlx::query_scalar::<_, Uuid>(
            "SELECT post_id FROM post_likes WHERE post_id = ANY($1) AND user_id = $2",
        )
        .bind(post_ids)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().collect())
    }
}

impl Notification {
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        kind: &str,
        content: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO notifications (user_id, kind, content) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(kind)
            .bind(content)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn recent_for_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, kind, content, is_read, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

impl PostView {
    /// 刚创建的帖子还没有评论和点赞
    pub fn fresh(post: PostAuthorRow, now: DateTime<Utc>) -> Self {
        PostView {
            time_ago: time_ago(post.created_at, now),
            like_count: 0,
            is_liked_by_current_user: false,
            comments: Vec::new(),
            id: post.id,
            content: post.content,
            image_url: post.image_url,
            created_at: post.created_at,
            author: AuthorView {
                name: post.author_name,
                photo_url: post.author_photo,
            },
        }
    }
}

impl From<CommentRow> for CommentView {
    fn from(row: CommentRow) -> Self {
        CommentView {
            id: row.id,
            comment: row.comment,
            created_at: row.created_at,
            author: AuthorView {
                name: row.author_name,
                photo_url: row.author_photo,
            },
        }
    }
}

impl From<Notification> for NotificationView {
    fn from(n: Notification) -> Self {
        NotificationView {
            id: n.id,
            kind: n.kind,
            content: n.content,
            is_read: n.is_read,
            created_at: n.created_at,
        }
    }
}

/// 把分页帖子、评论、点赞数据拼成返回视图,纯内存操作
pub fn assemble_post_views(
    posts: Vec<PostAuthorRow>,
    comments: Vec<CommentRow>,
    like_counts: HashMap<Uuid, i64>,
    liked_by_user: HashSet<Uuid>,
    now: DateTime<Utc>,
) -> Vec<PostView> {
    let mut grouped: HashMap<Uuid, Vec<CommentView>> = HashMap::new();
    for comment in comments {
        grouped
            .entry(comment.post_id)
            .or_default()
            .push(CommentView::from(comment));
    }

    posts
        .into_iter()
        .map(|post| {
            let comments = grouped.remove(&post.id).unwrap_or_default();
            PostView {
                time_ago: time_ago(post.created_at, now),
                like_count: like_counts.get(&post.id).copied().unwrap_or(0),
                is_liked_by_current_user: liked_by_user.contains(&post.id),
                comments,
                id: post.id,
                content: post.content,
                image_url: post.image_url,
                created_at: post.created_at,
                author: AuthorView {
                    name: post.author_name,
                    photo_url: post.author_photo,
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn post(id: Uuid, minutes_ago: i64) -> PostAuthorRow {
        PostAuthorRow {
            id,
            content: "测试内容".to_string(),
            image_url: None,
            created_at: base_time() - Duration::minutes(minutes_ago),
            author_name: "小安".to_string(),
            author_photo: None,
        }
    }

    fn comment(post_id: Uuid, text: &str, minutes_ago: i64) -> CommentRow {
        CommentRow {
            id: Uuid::new_v4(),
            post_id,
            comment: text.to_string(),
            created_at: base_time() - Duration::minutes(minutes_ago),
            author_name: "评论人".to_string(),
            author_photo: Some("http://img/1.jpg".to_string()),
        }
    }

    #[test]
    fn comments_are_grouped_under_their_posts() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let views = assemble_post_views(
            vec![post(a, 30), post(b, 60)],
            vec![comment(a, "第一条", 20), comment(a, "第二条", 10), comment(b, "另一帖", 5)],
            HashMap::new(),
            HashSet::new(),
            base_time(),
        );

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].comments.len(), 2);
        assert_eq!(views[0].comments[0].comment, "第一条");
        assert_eq!(views[1].comments.len(), 1);
    }

    #[test]
    fn like_state_reflects_counts_and_current_user() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut counts = HashMap::new();
        counts.insert(a, 3_i64);
        let mut liked = HashSet::new();
        liked.insert(a);

        let views = assemble_post_views(
            vec![post(a, 30), post(b, 60)],
            vec![],
            counts,
            liked,
            base_time(),
        );

        assert_eq!(views[0].like_count, 3);
        assert!(views[0].is_liked_by_current_user);
        assert_eq!(views[1].like_count, 0);
        assert!(!views[1].is_liked_by_current_user);
    }

    #[test]
    fn time_ago_is_rendered_from_creation_time() {
        let a = Uuid::new_v4();
        let views = assemble_post_views(
            vec![post(a, 30)],
            vec![],
            HashMap::new(),
            HashSet::new(),
            base_time(),
        );
        assert_eq!(views[0].time_ago, "30分钟前");
    }

    #[test]
    fn posts_without_comments_get_an_empty_list() {
        let a = Uuid::new_v4();
        let views = assemble_post_views(
            vec![post(a, 5)],
            vec![],
            HashMap::new(),
            HashSet::new(),
            base_time(),
        );
        assert!(views[0].comments.is_empty());
    }
}
