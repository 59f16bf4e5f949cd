pub mod message;
pub mod suggest;
pub mod user;
