//! Report routes.

use crate::handlers::reports;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn report_routes(state: AppState) -> Router {
    Router::new()
        .route("/reports", get(reports::reports))
        .route("/reports/profit", get(reports::profit))
        .with_state(state)
}
