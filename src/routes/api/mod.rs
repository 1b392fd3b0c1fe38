pub mod search;

use axum::Router;
use axum::routing::get;

use crate::orchestrator::Orchestrator;

pub fn router(orchestrator: Orchestrator) -> Router {
    let api = Router::new()
        .route("/search", get(search::search))
        .with_state(orchestrator);

    Router::new().nest("/api/v1", api)
}
