use axum::extract::{Extension, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use crate::common::{PaginatedResponse, Pagination};
use crate::error::AppError;
use crate::routes::auth::model::User;
use crate::routes::community::model::{
    assemble_post_views, AddCommentRequest, Comment, CommentView, Like, LikePostRequest,
    LikeResponse, Notification, NotificationView, Post, PostView,
};
use crate::services::media;
use crate::services::push::{self, PushMessage};
use crate::utils::forms::read_multipart_form;
use crate::utils::{parse_user_id, success_with_msg, Claims};
use crate::AppState;

const DEFAULT_PAGE_LIMIT: u32 = 10;
const MAX_PAGE_LIMIT: u32 = 50;
const NOTIFICATIONS_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct PostsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

fn parse_or(value: Option<&str>, default: u32) -> u32 {
    value.and_then(|s| s.parse::<u32>().ok()).unwrap_or(default)
}

#[axum::debug_handler]
pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_user_id(&claims)?;
    let mut form = read_multipart_form(&mut multipart).await?;

    let content = form.require("content", "帖子内容不能为空")?;
    let image_url = match form.image.take() {
        Some((filename, bytes)) => {
            Some(media::upload_image(&state.http, &state.config, bytes, &filename).await?)
        }
        None => None,
    };

    let row = Post::create(&state.pool, user_id, &content, image_url.as_deref()).await?;
    info!("post created: {} by {}", row.id, user_id);

    Ok((
        StatusCode::CREATED,
        success_with_msg("发布成功", PostView::fresh(row, Utc::now())),
    ))
}

#[axum::debug_handler]
pub async fn get_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PostsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_user_id(&claims)?;
    let page = parse_or(query.page.as_deref(), 1).max(1);
    let limit = parse_or(query.limit.as_deref(), DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
    let offset = ((page - 1) * limit) as i64;

    let posts = Post::page_with_authors(&state.pool, limit as i64, offset).await?;
    let total = Post::count(&state.pool).await?;

    let post_ids: Vec<_> = posts.iter().map(|p| p.id).collect();
    let comments = Comment::for_posts(&state.pool, &post_ids).await?;
    let like_counts = Like::counts_for_posts(&state.pool, &post_ids).await?;
    let liked = Like::liked_by_user(&state.pool, &post_ids, user_id).await?;

    let items = assemble_post_views(posts, comments, like_counts, liked, Utc::now());
    let pagination = Pagination::new(page, limit, total as u64);

    Ok((
        StatusCode::OK,
        success_with_msg("获取成功", PaginatedResponse { items, pagination }),
    ))
}

#[axum::debug_handler]
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_user_id(&claims)?;
    if req.comment.trim().is_empty() {
        return Err(AppError::Validation("评论内容不能为空".to_string()));
    }

    let (author_id, device_token) = Post::author_info(&state.pool, req.post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("帖子不存在".to_string()))?;

    let commenter = User::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("用户不存在".to_string()))?;

    let row = Comment::create(&state.pool, req.post_id, user_id, req.comment.trim()).await?;

    // 推送失败不影响评论本身
    let body = format!("{}评论了你的帖子", commenter.name);
    if let Some(token) = device_token.as_deref() {
        let message = PushMessage {
            title: "新评论!".to_string(),
            body: body.clone(),
        };
        if let Err(e) = push::send_push(&state.http, &state.config, token, &message).await {
            warn!("comment push failed for post {}: {:?}", req.post_id, e);
        }
    }
    Notification::create(&state.pool, author_id, "comment", &body).await?;

    Ok((
        StatusCode::OK,
        success_with_msg("评论已添加", CommentView::from(row)),
    ))
}

#[axum::debug_handler]
pub async fn like_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<LikePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_user_id(&claims)?;

    let (_, device_token) = Post::author_info(&state.pool, req.post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("帖子不存在".to_string()))?;

    let liker = User::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("用户不存在".to_string()))?;

    // 点赞和取消用同一个接口来回切换
    let liked = Like::try_insert(&state.pool, req.post_id, user_id).await?;
    if liked {
        if let Some(token) = device_token.as_deref() {
            let message = PushMessage {
                title: "新点赞!".to_string(),
                body: format!("{}赞了你的帖子", liker.name),
            };
            if let Err(e) = push::send_push(&state.http, &state.config, token, &message).await {
                warn!("like push failed for post {}: {:?}", req.post_id, e);
            }
        }
    } else {
        Like::remove(&state.pool, req.post_id, user_id).await?;
    }

    let like_count = Like::count(&state.pool, req.post_id).await?;
    let msg = if liked { "已点赞" } else { "已取消点赞" };
    Ok((
        StatusCode::OK,
        success_with_msg(msg, LikeResponse { liked, like_count }),
    ))
}

#[axum::debug_handler]
pub async fn get_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_user_id(&claims)?;
    let notifications =
        Notification::recent_for_user(&state.pool, user_id, NOTIFICATIONS_LIMIT).await?;
    let items: Vec<NotificationView> = notifications.into_iter().map(Into::into).collect();
    Ok((StatusCode::OK, success_with_msg("获取成功", items)))
}
