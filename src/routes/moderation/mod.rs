mod handler;

pub use handler::{
    approve_article, approve_video, pending_articles, pending_videos, reject_article, reject_video,
};
