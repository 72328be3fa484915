mod handler;

pub use handler::{automate_articles, automate_videos};
