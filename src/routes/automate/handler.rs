use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::AppError;
use crate::routes::content::model::{Article, Video};
use crate::services::content::{fetch_feed_videos, fetch_news_articles};
use crate::utils::success_with_msg;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AutomateResponse {
    /// 本次从外部接口拿到的条数
    pub fetched: usize,
    /// 实际新入库的条数,重复链接不算
    pub stored: u64,
}

/// 拉一批候选视频入待审队列,单条入库失败只记日志
#[axum::debug_handler]
pub async fn automate_videos(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let feed = fetch_feed_videos(&state.http, &state.config).await?;
    let fetched = feed.len();

    let mut stored = 0u64;
    for video in &feed {
        match Video::insert_pending(&state.pool, video).await {
            Ok(true) => stored += 1,
            Ok(false) => {}
            Err(e) => warn!("failed to store fetched video {}: {:?}", video.url, e),
        }
    }

    info!("video feed sync: {} fetched, {} stored", fetched, stored);
    Ok((
        StatusCode::OK,
        success_with_msg("视频抓取完成", AutomateResponse { fetched, stored }),
    ))
}

#[axum::debug_handler]
pub async fn automate_articles(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let feed = fetch_news_articles(&state.http, &state.config).await?;
    let fetched = feed.len();

    let mut stored = 0u64;
    for article in &feed {
        match Article::insert_pending(&state.pool, article).await {
            Ok(true) => stored += 1,
            Ok(false) => {}
            Err(e) => warn!("failed to store fetched article {}: {:?}", article.url, e),
        }
    }

    info!("article feed sync: {} fetched, {} stored", fetched, stored);
    Ok((
        StatusCode::OK,
        success_with_msg("文章抓取完成", AutomateResponse { fetched, stored }),
    ))
}
