//! Admin view handlers: index, list, schema, create, details, edit, delete, inline edit, relation lookup.

use crate::config::{Action, ColumnKind, ColumnPath, FormFieldKind, ListColumn, ResolvedEntity};
use crate::error::AppError;
use crate::extractors::AdminView;
use crate::format::display_map;
use crate::response::{success_many, success_one, success_one_ok, success_page, ListMeta};
use crate::service::{CrudService, FormValidator};
use crate::sql::ListQuery;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Query prefix for exact-match list filters (`flt_supplier_id=3`).
pub const FILTER_PREFIX: &str = "flt_";

/// Rows returned by one relation lookup.
pub const LOOKUP_LIMIT: u32 = 10;

fn parse_id(params: &HashMap<String, String>) -> Result<i64, AppError> {
    let raw = params.get("id").ok_or_else(|| AppError::BadRequest("missing id".into()))?;
    raw.trim().parse().map_err(|_| AppError::BadRequest("invalid id".into()))
}

fn body_to_map(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

fn require(admin: &AdminView, action: Action) -> Result<(), AppError> {
    let view = admin.view();
    if view.allows(action) {
        return Ok(());
    }
    tracing::warn!(view = %view.path_segment, action = action.as_str(), "action disallowed");
    Err(AppError::ActionDisallowed(format!("{} on {}", action.as_str(), view.name)))
}

fn query_value_for_column(entity: &ResolvedEntity, col: &str, s: &str) -> Value {
    let kind = entity.column(col).map(|c| c.kind);
    match kind {
        Some(ColumnKind::Integer) => {
            if let Ok(n) = s.parse::<i64>() {
                return Value::from(n);
            }
        }
        Some(ColumnKind::Real) => {
            if let Ok(f) = s.parse::<f64>() {
                return Value::from(f);
            }
        }
        Some(ColumnKind::Boolean) => {
            if s.eq_ignore_ascii_case("true") || s == "1" {
                return Value::Bool(true);
            }
            if s.eq_ignore_ascii_case("false") || s == "0" {
                return Value::Bool(false);
            }
        }
        _ => {}
    }
    Value::String(s.to_string())
}

fn path_string(path: &ColumnPath) -> String {
    match path {
        ColumnPath::Column(c) => c.clone(),
        ColumnPath::ToOne { relation, column } | ColumnPath::ManyToMany { relation, column } => {
            format!("{}.{}", relation, column)
        }
    }
}

pub async fn index(State(state): State<AppState>) -> Result<impl axum::response::IntoResponse, AppError> {
    let views: Vec<Value> = state
        .model
        .views
        .iter()
        .map(|v| {
            json!({
                "name": v.name,
                "path": v.path_segment,
                "url": format!("/admin/{}/", v.path_segment),
            })
        })
        .collect();
    Ok(success_one_ok(json!({
        "name": state.settings.admin_name(),
        "views": views,
    })))
}

pub async fn list(
    State(state): State<AppState>,
    admin: AdminView,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let view = admin.view();
    let entity = admin.entity()?;

    let mut page: u32 = 0;
    let mut list = ListQuery {
        limit: view.page_size,
        ..Default::default()
    };
    for (k, v) in params {
        match k.as_str() {
            "page" => {
                page = v.parse().map_err(|_| AppError::BadRequest("invalid page".into()))?;
            }
            "search" => {
                list.search = Some(v).filter(|s| !s.trim().is_empty());
            }
            "sort" => list.sort = Some(v),
            "desc" => list.desc = matches!(v.as_str(), "1" | "true"),
            _ => {
                if let Some(col) = k.strip_prefix(FILTER_PREFIX) {
                    if entity.column(col).is_some() {
                        let val = query_value_for_column(entity, col, &v);
                        list.filters.push((col.to_string(), val));
                    }
                }
            }
        }
    }
    list.filters.sort_by(|a, b| a.0.cmp(&b.0));
    list.offset = page.saturating_mul(view.page_size);

    let result = CrudService::list(&state.pool, admin.model(), view, entity, &list).await?;
    let rows: Vec<Value> = result
        .rows
        .into_iter()
        .map(|mut row| {
            let display = display_map(view, &row);
            if let Value::Object(m) = &mut row {
                m.insert("display".into(), Value::Object(display));
            }
            row
        })
        .collect();
    let meta = ListMeta::new(rows.len(), result.total, page, view.page_size);
    Ok(success_page(rows, meta))
}

pub async fn schema(admin: AdminView) -> Result<impl axum::response::IntoResponse, AppError> {
    let view = admin.view();
    let list_columns: Vec<Value> = view
        .list_columns
        .iter()
        .map(|c| {
            let kind = match c {
                ListColumn::Scalar(_) => "scalar",
                ListColumn::ToOne(_) => "to_one",
                ListColumn::ManyToMany(_) => "many_to_many",
            };
            json!({ "name": c.name(), "kind": kind })
        })
        .collect();
    let actions: Map<String, Value> = [Action::Create, Action::Edit, Action::Delete]
        .into_iter()
        .map(|a| (a.as_str().to_string(), Value::Bool(view.allows(a))))
        .collect();
    Ok(success_one_ok(json!({
        "name": view.name,
        "path": view.path_segment,
        "list_columns": list_columns,
        "searchable": view.searchable.iter().map(path_string).collect::<Vec<_>>(),
        "form_fields": view.form_fields,
        "editable": view.editable,
        "formatters": view.formatters,
        "actions": actions,
        "page_size": view.page_size,
    })))
}

pub async fn create(
    State(state): State<AppState>,
    admin: AdminView,
    Json(body): Json<Value>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    require(&admin, Action::Create)?;
    let entity = admin.entity()?;
    let body = body_to_map(body)?;
    let form = FormValidator::validate(admin.view(), entity, &body)?;
    let row = CrudService::create(&state.pool, admin.model(), entity, &form).await?;
    Ok(success_one(row))
}

pub async fn details(
    State(state): State<AppState>,
    admin: AdminView,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let entity = admin.entity()?;
    let id = parse_id(&params)?;
    let row = CrudService::details(&state.pool, admin.model(), entity, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", admin.view().name, id)))?;
    Ok(success_one_ok(row))
}

pub async fn edit(
    State(state): State<AppState>,
    admin: AdminView,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    require(&admin, Action::Edit)?;
    let entity = admin.entity()?;
    let id = parse_id(&params)?;
    let body = body_to_map(body)?;
    let form = FormValidator::validate_partial(admin.view(), entity, &body)?;
    let row = CrudService::update(&state.pool, admin.model(), entity, id, &form).await?;
    Ok(success_one_ok(row))
}

pub async fn delete(
    State(state): State<AppState>,
    admin: AdminView,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    require(&admin, Action::Delete)?;
    let entity = admin.entity()?;
    let id = parse_id(&params)?;
    CrudService::delete(&state.pool, entity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct InlineEdit {
    pub id: i64,
    pub column: String,
    #[serde(default)]
    pub value: Value,
}

/// Set one `column_editable_list` column of one row.
pub async fn ajax_update(
    State(state): State<AppState>,
    admin: AdminView,
    Json(edit): Json<InlineEdit>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    require(&admin, Action::Edit)?;
    let view = admin.view();
    let entity = admin.entity()?;
    if !view.editable.iter().any(|c| *c == edit.column) {
        return Err(AppError::BadRequest(format!("{} is not editable", edit.column)));
    }
    let mut body = Map::new();
    body.insert(edit.column, edit.value);
    let form = FormValidator::validate_partial(view, entity, &body)?;
    let row = CrudService::update(&state.pool, admin.model(), entity, edit.id, &form).await?;
    Ok(success_one_ok(row))
}

/// Choices for a relation form field: `name` is the field, `query` filters labels.
pub async fn ajax_lookup(
    State(state): State<AppState>,
    admin: AdminView,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let view = admin.view();
    let name = params
        .get("name")
        .ok_or_else(|| AppError::BadRequest("missing name".into()))?;
    let related_id = match view.form_field(name).map(|f| &f.kind) {
        Some(FormFieldKind::ToOne { related, .. } | FormFieldKind::ManyToMany { related }) => related,
        _ => return Err(AppError::BadRequest(format!("{} is not a relation field", name))),
    };
    let related = admin
        .model()
        .entity(related_id)
        .ok_or_else(|| AppError::NotFound(format!("entity {}", related_id)))?;
    let choices = CrudService::choices(
        &state.pool,
        admin.model(),
        related,
        params.get("query").map(String::as_str),
        LOOKUP_LIMIT,
    )
    .await?;
    Ok(success_many(choices))
}
