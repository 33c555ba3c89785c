//! Saved Logs Insights query definitions.

use std::sync::Arc;

use super::client::LogsBackend;
use super::types::SavedQuery;
use crate::app::data_plane::pagination::collect_pages;
use crate::app::errors::EngineError;

#[derive(Clone)]
pub struct SavedQueryCatalog {
    backend: Arc<dyn LogsBackend>,
}

impl SavedQueryCatalog {
    pub fn new(backend: Arc<dyn LogsBackend>) -> Self {
        Self { backend }
    }

    /// All saved query definitions, across every page
    pub async fn list(&self) -> Result<Vec<SavedQuery>, EngineError> {
        let backend = self.backend.as_ref();
        match collect_pages(move |token| backend.describe_query_definitions(token)).await {
            Ok(queries) => {
                log_info!(
                    "Retrieved {} saved CloudWatch Logs Insights queries",
                    queries.len()
                );
                Ok(queries)
            }
            Err(e) => {
                log_error!(
                    "Error fetching saved CloudWatch Logs Insights queries: {:#}",
                    e
                );
                Err(EngineError::transport("get_saved_queries", &e))
            }
        }
    }
}
