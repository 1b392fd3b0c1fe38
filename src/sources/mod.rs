// Source adapters: one implementation per job board, selected by `JobSource`.

pub mod careerjet;
pub mod efinancialcareers;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::browser::BrowserDriver;
use crate::config::RetrievalSettings;
use crate::error::RetrievalError;
use crate::models::job::{JobRecord, JobSource};
use crate::models::search::SearchRequest;

/// Trait that every job source implements.
/// A search owns whatever session it opens and tears it down before returning.
/// `Err(RetrievalError::NoResults)` is the "search ran, nothing matched" signal.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> JobSource;

    async fn search(&self, request: &SearchRequest) -> Result<Vec<JobRecord>, RetrievalError>;
}

/// Adapters keyed by source. Unregistered sources fall back to the default one.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    adapters: HashMap<JobSource, Arc<dyn SourceAdapter>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The production set: the browser-driven primary site and the API source.
    pub fn standard(settings: RetrievalSettings, driver: Arc<dyn BrowserDriver>) -> Self {
        Self::new()
            .register(Arc::new(efinancialcareers::EFinancialCareers::new(
                settings.clone(),
                driver,
            )))
            .register(Arc::new(careerjet::Careerjet::new(settings)))
    }

    pub fn register(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.adapters.insert(adapter.source(), adapter);
        self
    }

    pub fn get(&self, source: JobSource) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters
            .get(&source)
            .or_else(|| self.adapters.get(&JobSource::default()))
            .cloned()
    }
}
