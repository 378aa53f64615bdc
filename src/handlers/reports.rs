//! Report handlers.

use crate::error::AppError;
use crate::format::format_currency;
use crate::report::profits_from_sales;
use crate::response::success_one_ok;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode};
use serde_json::json;

/// Reports index; there is nothing to list yet.
pub async fn reports() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn profit(State(state): State<AppState>) -> Result<impl axum::response::IntoResponse, AppError> {
    let tally = profits_from_sales(&state.pool).await?;
    Ok(success_one_ok(json!({
        "total": tally.total,
        "count": tally.count,
        "total_display": format_currency(tally.total),
    })))
}
