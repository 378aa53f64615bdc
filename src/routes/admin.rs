//! Admin routes. Every view is served under `/admin/{view}/`.

use crate::handlers::admin;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn admin_routes(state: AppState) -> Router {
    Router::new()
        .route("/admin/", get(admin::index))
        .route("/admin/:view/", get(admin::list))
        .route("/admin/:view/schema/", get(admin::schema))
        .route("/admin/:view/new/", post(admin::create))
        .route("/admin/:view/details/", get(admin::details))
        .route("/admin/:view/edit/", post(admin::edit))
        .route("/admin/:view/delete/", post(admin::delete))
        .route("/admin/:view/ajax/update/", post(admin::ajax_update))
        .route("/admin/:view/ajax/lookup/", get(admin::ajax_lookup))
        .with_state(state)
}
