use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::store::PortfolioStore;
use crate::views::{Clock, ViewAccounting};

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PortfolioStore>,
    pub views: ViewAccounting,
    pub clock: Arc<dyn Clock>,
    pub max_list_limit: i64,
}

impl AppState {
    pub fn new(store: Arc<dyn PortfolioStore>, clock: Arc<dyn Clock>, config: &AppConfig) -> Self {
        let views = ViewAccounting::new(store.clone(), clock.clone(), &config.views);
        Self {
            store,
            views,
            clock,
            max_list_limit: config.api.max_list_limit,
        }
    }
}
