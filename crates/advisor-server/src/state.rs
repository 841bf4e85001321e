//! Application State

use std::sync::Arc;

use stock_advisor::{InvestmentAdvisor, SessionStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Advisory cycle (universe, quotes, news)
    pub advisor: Arc<InvestmentAdvisor>,

    /// Advisory sessions
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(advisor: InvestmentAdvisor) -> Self {
        Self {
            advisor: Arc::new(advisor),
            sessions: Arc::new(SessionStore::new()),
        }
    }
}
