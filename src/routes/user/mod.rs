mod handler;
mod model;

pub use handler::{check_username, login, register, resend_code, verify_code};
