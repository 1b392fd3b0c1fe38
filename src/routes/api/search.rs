use axum::Json;
use axum::extract::{Query, State};

use crate::error::AppError;
use crate::models::outcome::SearchOutcome;
use crate::models::search::SearchParams;
use crate::orchestrator::Orchestrator;

/// `GET /api/v1/search?title=..&location=..&max_jobs=..&seniority=..&region=..&source=..`
///
/// Failed searches are still `200 OK`; the outcome's `status` tells them apart.
pub async fn search(
    State(orchestrator): State<Orchestrator>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchOutcome>, AppError> {
    if params.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".to_string()));
    }
    Ok(Json(orchestrator.search_params(params).await))
}
