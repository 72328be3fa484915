mod handler;
pub mod model;

pub use handler::{create_challenge, get_challenges};
