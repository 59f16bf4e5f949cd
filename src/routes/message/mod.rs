mod handler;
mod model;

pub use handler::{delete_message, get_accepting, list_messages, send_message, set_accepting};
