mod handler;
pub mod model;

pub use handler::{create_entry, get_entries};
