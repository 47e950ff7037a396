use std::sync::Arc;

pub mod auth;
pub mod config;
pub mod filter;
pub mod handlers;
pub mod import;
pub mod models;
pub mod notify;
pub mod routes;
pub mod store;
pub mod utils;

use config::Config;
use notify::Mailer;
use store::Store;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, config: Config) -> Self {
        Self {
            store,
            mailer,
            config: Arc::new(config),
        }
    }
}
