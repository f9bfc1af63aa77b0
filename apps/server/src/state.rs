//! Shared application state.

use std::sync::Arc;

use brewline_db::{CheckoutService, Database};

use crate::config::{ConfigError, ServerConfig};

/// Handed to every handler. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub checkout: CheckoutService,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wires the checkout service from `config` onto an open database.
    pub fn new(db: Database, config: ServerConfig) -> Result<Self, ConfigError> {
        let checkout = CheckoutService::new(db.clone(), config.fingerprint()?, config.stock_policy());
        Ok(AppState {
            db,
            checkout,
            config: Arc::new(config),
        })
    }
}
