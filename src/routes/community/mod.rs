mod handler;
pub mod model;

pub use handler::{add_comment, create_post, get_notifications, get_posts, like_post};
