mod handler;
pub mod model;

pub use handler::{
    forgot_password, get_profile, login, register, reset_password, update_profile, upload_avatar,
    validate_token, verify_code,
};
