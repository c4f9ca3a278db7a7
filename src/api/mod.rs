pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::ml::InferenceService;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: InferenceService,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(service: InferenceService) -> Self {
        Self {
            service,
            started_at: Instant::now(),
        }
    }
}
