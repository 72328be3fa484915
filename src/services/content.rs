// 心理健康科普内容的抓取:新闻文章与练习视频

use serde::Deserialize;

use crate::config::Config;
use crate::error::AppError;

const NEWS_KEYWORDS: &str = "心理健康 OR 情绪健康 OR 焦虑 OR 抑郁";
const VIDEO_KEYWORDS: &str = "冥想, 心理健康";
const NEWS_PAGE_SIZE: u32 = 10;
const VIDEO_MAX_RESULTS: u32 = 5;

/// 抓取后待入库的文章,缺标题或链接的在解析阶段就被丢弃
#[derive(Debug, PartialEq)]
pub struct FeedArticle {
    pub title: String,
    pub content: Option<String>,
    pub author: Option<String>,
    pub url: String,
    pub source: Option<String>,
}

#[derive(Debug, PartialEq)]
pub struct FeedVideo {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub thumbnail: Option<String>,
    pub channel_name: Option<String>,
}

pub async fn fetch_news_articles(
    http: &reqwest::Client,
    config: &Config,
) -> Result<Vec<FeedArticle>, AppError> {
    let page_size = NEWS_PAGE_SIZE.to_string();
    let resp = http
        .get(&config.news_api_url)
        .query(&[
            ("q", NEWS_KEYWORDS),
            ("language", "zh"),
            ("sortBy", "relevancy"),
            ("pageSize", page_size.as_str()),
            ("apiKey", config.news_api_key.as_str()),
        ])
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(AppError::ProviderUnavailable(format!(
            "news api returned http {}",
            resp.status()
        )));
    }

    let payload: NewsResponse = resp.json().await?;
    Ok(normalize_articles(payload))
}

pub async fn fetch_feed_videos(
    http: &reqwest::Client,
    config: &Config,
) -> Result<Vec<FeedVideo>, AppError> {
    let max_results = VIDEO_MAX_RESULTS.to_string();
    let resp = http
        .get(&config.video_api_url)
        .query(&[
            ("part", "snippet"),
            ("q", VIDEO_KEYWORDS),
            ("type", "video"),
            ("maxResults", max_results.as_str()),
            ("key", config.video_api_key.as_str()),
        ])
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(AppError::ProviderUnavailable(format!(
            "video api returned http {}",
            resp.status()
        )));
    }

    let payload: VideoSearchResponse = resp.json().await?;
    Ok(normalize_videos(payload))
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<NewsArticleDto>,
}

#[derive(Debug, Deserialize)]
struct NewsArticleDto {
    title: Option<String>,
    author: Option<String>,
    url: Option<String>,
    content: Option<String>,
    source: Option<NewsSourceDto>,
}

#[derive(Debug, Deserialize)]
struct NewsSourceDto {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoSearchResponse {
    #[serde(default)]
    items: Vec<VideoItemDto>,
}

#[derive(Debug, Deserialize)]
struct VideoItemDto {
    id: VideoIdDto,
    snippet: Option<VideoSnippetDto>,
}

#[derive(Debug, Deserialize)]
struct VideoIdDto {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoSnippetDto {
    title: Option<String>,
    description: Option<String>,
    thumbnails: Option<ThumbnailsDto>,
    #[serde(rename = "channelTitle")]
    channel_title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ThumbnailsDto {
    default: Option<ThumbnailDto>,
}

#[derive(Debug, Deserialize)]
struct ThumbnailDto {
    url: Option<String>,
}

fn normalize_articles(payload: NewsResponse) -> Vec<FeedArticle> {
    let mut skipped = 0usize;
    let articles: Vec<FeedArticle> = payload
        .articles
        .into_iter()
        .filter_map(|a| {
            // 缺标题或链接的条目没法展示,直接跳过
            let (title, url) = match (a.title, a.url) {
                (Some(t), Some(u)) if !t.is_empty() && !u.is_empty() => (t, u),
                _ => {
                    skipped += 1;
                    return None;
                }
            };
            Some(FeedArticle {
                title,
                content: a.content.filter(|s| !s.is_empty()),
                author: a.author.filter(|s| !s.is_empty()),
                url,
                source: a.source.and_then(|s| s.name).filter(|s| !s.is_empty()),
            })
        })
        .collect();

    if skipped > 0 {
        tracing::warn!("skipped {} malformed feed articles", skipped);
    }
    articles
}

fn normalize_videos(payload: VideoSearchResponse) -> Vec<FeedVideo> {
    payload
        .items
        .into_iter()
        .filter_map(|item| {
            // 搜索结果里混有频道和播放列表,只保留带 videoId 的条目
            let video_id = item.id.video_id?;
            let snippet = item.snippet?;
            let title = snippet.title.filter(|s| !s.is_empty())?;
            Some(FeedVideo {
                title,
                description: snippet.description.filter(|s| !s.is_empty()),
                url: format!("https://www.youtube.com/watch?v={}", video_id),
                thumbnail: snippet.thumbnails.and_then(|t| t.default).and_then(|d| d.url),
                channel_name: snippet.channel_title.filter(|s| !s.is_empty()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn articles_missing_title_or_url_are_skipped() {
        let payload: NewsResponse = serde_json::from_value(json!({
            "articles": [
                { "title": "正念练习入门", "url": "https://news.example.com/a1" },
                { "title": null, "url": "https://news.example.com/a2" },
                { "title": "没有链接的文章" },
                { "title": "", "url": "https://news.example.com/a3" }
            ]
        }))
        .unwrap();

        let articles = normalize_articles(payload);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "正念练习入门");
    }

    #[test]
    fn article_optional_fields_flow_through() {
        let payload: NewsResponse = serde_json::from_value(json!({
            "articles": [{
                "title": "焦虑自助指南",
                "url": "https://news.example.com/b1",
                "author": "李医生",
                "content": "正文……",
                "source": { "name": "健康日报" }
            }]
        }))
        .unwrap();

        let articles = normalize_articles(payload);
        assert_eq!(articles[0].author.as_deref(), Some("李医生"));
        assert_eq!(articles[0].source.as_deref(), Some("健康日报"));
    }

    #[test]
    fn video_url_is_built_from_video_id() {
        let payload: VideoSearchResponse = serde_json::from_value(json!({
            "items": [{
                "id": { "videoId": "abc123" },
                "snippet": {
                    "title": "十分钟冥想",
                    "description": "晚间放松练习",
                    "thumbnails": { "default": { "url": "https://img.example.com/t.jpg" } },
                    "channelTitle": "安心频道"
                }
            }]
        }))
        .unwrap();

        let videos = normalize_videos(payload);
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(videos[0].channel_name.as_deref(), Some("安心频道"));
    }

    #[test]
    fn non_video_items_are_dropped() {
        let payload: VideoSearchResponse = serde_json::from_value(json!({
            "items": [
                { "id": {}, "snippet": { "title": "某个频道" } },
                { "id": { "videoId": "xyz" }, "snippet": { "title": "正念呼吸" } }
            ]
        }))
        .unwrap();

        let videos = normalize_videos(payload);
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].title, "正念呼吸");
    }
}
