mod account;
mod message;

pub use account::{Account, code_expiry, generate_verify_code};
pub use message::Message;
