use axum::{extract::DefaultBodyLimit, routing, Router};

use crate::state::AppState;

use super::{devices, results, stats};

// Compressed census blobs can be large; the original service accepted up to
// 100 MB per submission.
const MAX_RESULT_BODY_SIZE: usize = 100 * 1024 * 1024;

pub fn add_routes(router: Router<AppState>, state: AppState) -> Router {
    router
        .route("/", routing::get(index))
        .route("/_readiness", routing::get(index))
        .route("/_liveness", routing::get(index))
        .route(
            "/results",
            routing::post(results::submit).layer(DefaultBodyLimit::max(MAX_RESULT_BODY_SIZE)),
        )
        .route("/results/:id", routing::get(results::show))
        .route("/process_results", routing::get(results::process))
        .route("/devices", routing::get(devices::list))
        .route("/devices/:id", routing::get(devices::show))
        .route(
            "/devices/:id/small_files/*path",
            routing::get(devices::small_file),
        )
        .route("/stats/os_versions", routing::get(stats::os_versions))
        .route("/stats/manufacturers", routing::get(stats::manufacturers))
        .with_state(state)
}

pub async fn index() -> &'static str {
    "device-census api"
}
