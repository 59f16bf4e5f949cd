use std::sync::Arc;

use config::Config;
use email::Mailer;
use store::AccountStore;

pub mod config;
pub mod email;
pub mod error;
pub mod middleware;
pub mod models;
pub mod store;
pub mod utils;

pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AccountStore>,
    pub mailer: Arc<dyn Mailer>,
    pub http: reqwest::Client,
    pub config: Config,
}
