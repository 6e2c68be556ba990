pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::processing::{CleanupSweeper, CorrelationEngine};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CorrelationEngine>,
    pub sweeper: Arc<CleanupSweeper>,
    pub started_at: Instant,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(engine: Arc<CorrelationEngine>, sweeper: Arc<CleanupSweeper>) -> Self {
        Self {
            engine,
            sweeper,
            started_at: Instant::now(),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
