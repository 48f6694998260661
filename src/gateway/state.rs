use std::sync::Arc;

use crate::catalog::CatalogClient;
use crate::recommend::RecommendationOrchestrator;
use crate::vectordb::VectorDbClient;

pub struct HandlerState<C: VectorDbClient + 'static> {
    pub orchestrator: RecommendationOrchestrator<C>,

    pub catalog: Arc<CatalogClient>,
}

impl<C: VectorDbClient + 'static> Clone for HandlerState<C> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: self.orchestrator.clone(),
            catalog: Arc::clone(&self.catalog),
        }
    }
}

impl<C: VectorDbClient + 'static> HandlerState<C> {
    pub fn new(orchestrator: RecommendationOrchestrator<C>, catalog: Arc<CatalogClient>) -> Self {
        Self {
            orchestrator,
            catalog,
        }
    }
}
