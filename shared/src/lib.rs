pub mod types;
pub mod error;
pub mod config;
pub mod validations;
pub mod render;
pub mod session;
pub mod auth;
pub mod sheets;
pub mod repository;
pub mod responses;
pub mod forms;

use config::AppConfig;
use repository::FormRepository;
use session::Clock;
use sheets::TabularStore;
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub config: AppConfig,
    pub repository: FormRepository,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn TabularStore>, clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            config,
            repository: FormRepository::new(store),
            clock,
        })
    }
}
