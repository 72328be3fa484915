pub mod model;

mod handler;

pub use handler::find_nearby;
