mod handler;

pub use handler::send_support_message;
