use std::sync::Arc;

use crate::{
    cache::Cache,
    services::{providers::MovieProvider, RecommendationEngine},
};

/// Shared application state
///
/// Cloned into every handler; all members are reference counted.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn MovieProvider>,
    pub cache: Arc<Cache>,
    pub engine: RecommendationEngine,
}

impl AppState {
    pub fn new(provider: Arc<dyn MovieProvider>, cache: Arc<Cache>) -> Self {
        let engine = RecommendationEngine::new(provider.clone(), cache.clone());
        Self {
            provider,
            cache,
            engine,
        }
    }
}
