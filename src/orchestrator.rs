// Dispatches a search to its source adapter and turns the result into a `SearchOutcome`.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures::FutureExt;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::RetrievalError;
use crate::models::job::{JobRecord, NO_LINK};
use crate::models::outcome::{ErrorKind, ErrorRecord, SearchOutcome};
use crate::models::search::{SearchParams, SearchRequest};
use crate::normalize::with_company_placeholder;
use crate::sources::SourceRegistry;

#[derive(Clone)]
pub struct Orchestrator {
    registry: SourceRegistry,
}

impl Orchestrator {
    pub fn new(registry: SourceRegistry) -> Self {
        Self { registry }
    }

    /// Validate raw caller input, then search.
    pub async fn search_params(&self, params: SearchParams) -> SearchOutcome {
        self.search(&SearchRequest::from(params)).await
    }

    pub async fn search(&self, request: &SearchRequest) -> SearchOutcome {
        let span = tracing::info_span!(
            "search",
            id = %Uuid::new_v4(),
            source = %request.source,
            region = request.region.code(),
        );
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: &SearchRequest) -> SearchOutcome {
        let Some(adapter) = self.registry.get(request.source) else {
            tracing::error!("No adapter registered for {}", request.source);
            return SearchOutcome::error(ErrorRecord::notice(ErrorKind::Unknown));
        };
        if adapter.source() != request.source {
            tracing::info!(
                "No adapter for {}, using {}",
                request.source,
                adapter.source()
            );
        }

        tracing::info!(
            "Searching '{}' in '{}' (max {})",
            request.title,
            request.location,
            request.max_jobs
        );
        let started = Instant::now();
        let result = AssertUnwindSafe(adapter.search(request))
            .catch_unwind()
            .await;
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok(Ok(jobs)) => {
                let found = jobs.len();
                let jobs = finalize(jobs, request.max_jobs);
                tracing::info!(
                    "Search finished in {elapsed:.1}s: {} of {found} candidates kept",
                    jobs.len()
                );
                SearchOutcome::jobs(jobs)
            }
            Ok(Err(e)) => {
                match &e {
                    RetrievalError::NoResults(_) => {
                        tracing::info!("Search finished in {elapsed:.1}s with no results")
                    }
                    _ => tracing::warn!("Search failed after {elapsed:.1}s: {e}"),
                }
                SearchOutcome::error(e.into_record())
            }
            Err(panic) => {
                tracing::error!(
                    "Adapter {} panicked: {}",
                    adapter.source(),
                    panic_message(panic.as_ref())
                );
                SearchOutcome::error(ErrorRecord::notice(ErrorKind::Unknown))
            }
        }
    }
}

/// Drop incomplete and repeated records, fill the company placeholder and cap the list.
fn finalize(jobs: Vec<JobRecord>, max_jobs: usize) -> Vec<JobRecord> {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    for job in jobs {
        if kept.len() >= max_jobs {
            break;
        }
        if !job.is_complete() {
            tracing::debug!("Dropping incomplete record '{}'", job.title);
            continue;
        }
        if job.link != NO_LINK && !seen.insert(job.link.clone()) {
            tracing::debug!("Dropping repeated link {}", job.link);
            continue;
        }
        kept.push(with_company_placeholder(job));
    }
    kept
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
