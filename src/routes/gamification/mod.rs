mod handler;
pub mod model;

pub use handler::{claim_reward, get_progress, get_rewards, update_progress};
