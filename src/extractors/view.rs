//! Resolve the `{view}` path segment to a registered admin view.

use crate::config::{ResolvedEntity, ResolvedModel, ResolvedView};
use crate::error::AppError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Path parameter naming the view in admin routes.
pub const VIEW_PARAM: &str = "view";

/// A registered admin view and its entity. Rejects with 404 for unknown segments.
#[derive(Clone, Debug)]
pub struct AdminView {
    model: Arc<ResolvedModel>,
    index: usize,
}

impl AdminView {
    pub fn model(&self) -> &ResolvedModel {
        &self.model
    }

    pub fn view(&self) -> &ResolvedView {
        &self.model.views[self.index]
    }

    pub fn entity(&self) -> Result<&ResolvedEntity, AppError> {
        let view = self.view();
        self.model
            .entity(&view.entity_id)
            .ok_or_else(|| AppError::NotFound(format!("entity {}", view.entity_id)))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminView {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let segment = params
            .get(VIEW_PARAM)
            .ok_or_else(|| AppError::BadRequest("missing view".into()))?;
        let index = state
            .model
            .view_index(segment)
            .ok_or_else(|| AppError::NotFound(format!("view {}", segment)))?;
        Ok(AdminView {
            model: state.model.clone(),
            index,
        })
    }
}
