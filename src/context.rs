use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::TicketStore;

#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub tickets: Arc<dyn TicketStore>,
}

impl AppContext {
    pub fn new(config: AppConfig, tickets: Arc<dyn TicketStore>) -> Self {
        Self { config, tickets }
    }
}
