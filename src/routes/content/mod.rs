mod handler;
pub mod model;

pub use handler::{get_articles, get_videos};
