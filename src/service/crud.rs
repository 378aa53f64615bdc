//! Generic CRUD execution against SQLite.

use crate::config::{ColumnKind, ResolvedEntity, ResolvedModel, ResolvedView};
use crate::error::AppError;
use crate::service::FormData;
use crate::sql::{
    count_list, delete, insert, junction_clear, junction_insert, select_choices, select_details, select_exists,
    select_list, update, CellKind, ListQuery, OutputColumn, QueryBuf, SqliteBindValue,
};
use serde_json::{Map, Value};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Row, SqliteConnection, SqlitePool};

/// One page of a list view plus the total number of matching rows.
#[derive(Debug)]
pub struct ListPage {
    pub rows: Vec<Value>,
    pub total: i64,
}

pub struct CrudService;

impl CrudService {
    /// List rows for a view: search, filters, sort and window from `list`.
    pub async fn list(
        pool: &SqlitePool,
        model: &ResolvedModel,
        view: &ResolvedView,
        entity: &ResolvedEntity,
        list: &ListQuery,
    ) -> Result<ListPage, AppError> {
        let count = count_list(model, view, entity, list);
        let total: i64 = bound(&count).fetch_one(pool).await?.try_get(0)?;
        let q = select_list(model, view, entity, list);
        let rows = bound(&q).fetch_all(pool).await?;
        Ok(ListPage {
            rows: rows.iter().map(|r| row_to_json(r, &q.shape)).collect(),
            total,
        })
    }

    /// Fetch one row by primary key with relation labels. Returns None when missing.
    pub async fn details(
        pool: &SqlitePool,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        id: i64,
    ) -> Result<Option<Value>, AppError> {
        let q = select_details(model, entity, id);
        let row = bound(&q).fetch_optional(pool).await?;
        Ok(row.map(|r| row_to_json(&r, &q.shape)))
    }

    /// Insert one row and its associations in a transaction. Returns the created row.
    pub async fn create(
        pool: &SqlitePool,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        form: &FormData,
    ) -> Result<Value, AppError> {
        let mut tx = pool.begin().await?;
        check_references(&mut tx, model, entity, form).await?;
        let q = insert(entity, &form.columns);
        let id: i64 = bound(&q).fetch_one(&mut *tx).await?.try_get(0)?;
        replace_associations(&mut tx, entity, id, form).await?;
        tx.commit().await?;
        tracing::info!(table = %entity.table_name, id, "row created");
        Self::details(pool, model, entity, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", entity.table_name, id)))
    }

    /// Apply a partial form to one row. Returns the updated row; NotFound when the row does not exist.
    pub async fn update(
        pool: &SqlitePool,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        id: i64,
        form: &FormData,
    ) -> Result<Value, AppError> {
        let mut tx = pool.begin().await?;
        let exists = bound(&select_exists(entity, id)).fetch_optional(&mut *tx).await?.is_some();
        if !exists {
            return Err(AppError::NotFound(format!("{} {}", entity.table_name, id)));
        }
        check_references(&mut tx, model, entity, form).await?;
        if form.columns.iter().any(|(name, _)| *name != entity.pk_column) {
            let q = update(entity, id, &form.columns);
            bound(&q).execute(&mut *tx).await?;
        }
        replace_associations(&mut tx, entity, id, form).await?;
        tx.commit().await?;
        tracing::info!(table = %entity.table_name, id, "row updated");
        Self::details(pool, model, entity, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", entity.table_name, id)))
    }

    /// Delete one row by id; NotFound when nothing was deleted.
    pub async fn delete(pool: &SqlitePool, entity: &ResolvedEntity, id: i64) -> Result<(), AppError> {
        let q = delete(entity, id);
        let done = bound(&q).execute(pool).await?;
        if done.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("{} {}", entity.table_name, id)));
        }
        tracing::info!(table = %entity.table_name, id, "row deleted");
        Ok(())
    }

    /// `{id, label}` choices of the related entity, filtered by label substring.
    pub async fn choices(
        pool: &SqlitePool,
        model: &ResolvedModel,
        related: &ResolvedEntity,
        query: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Value>, AppError> {
        let q = select_choices(model, related, query, limit);
        let rows = bound(&q).fetch_all(pool).await?;
        Ok(rows.iter().map(|r| row_to_json(r, &q.shape)).collect())
    }
}

/// Bind the buffer's parameters to a query over its SQL.
fn bound(q: &QueryBuf) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(SqliteBindValue::from_json(p));
    }
    query
}

/// Every referenced row must exist: relation ids and association ids alike.
async fn check_references(
    conn: &mut SqliteConnection,
    model: &ResolvedModel,
    entity: &ResolvedEntity,
    form: &FormData,
) -> Result<(), AppError> {
    for (column, value) in &form.columns {
        let Some(rel) = entity.to_one_by_fk(column) else { continue };
        let Some(id) = value.as_i64() else { continue };
        let Some(related) = model.entity(&rel.related_table_id) else { continue };
        if bound(&select_exists(related, id)).fetch_optional(&mut *conn).await?.is_none() {
            return Err(AppError::Validation(format!("{}: not a valid choice", rel.name)));
        }
    }
    for (name, ids) in &form.associations {
        let Some(related) = entity.many(name).and_then(|m| model.entity(&m.related_table_id)) else {
            continue;
        };
        for id in ids {
            if bound(&select_exists(related, *id)).fetch_optional(&mut *conn).await?.is_none() {
                return Err(AppError::Validation(format!("{}: not a valid choice", name)));
            }
        }
    }
    Ok(())
}

/// Replace the association set of each many-to-many field present in the form.
async fn replace_associations(
    conn: &mut SqliteConnection,
    entity: &ResolvedEntity,
    owner_id: i64,
    form: &FormData,
) -> Result<(), AppError> {
    for (name, ids) in &form.associations {
        let Some(m2m) = entity.many(name) else { continue };
        bound(&junction_clear(m2m, owner_id)).execute(&mut *conn).await?;
        for id in ids {
            bound(&junction_insert(m2m, owner_id, *id)).execute(&mut *conn).await?;
        }
    }
    Ok(())
}

fn row_to_json(row: &SqliteRow, shape: &[OutputColumn]) -> Value {
    let mut map = Map::new();
    for (i, col) in shape.iter().enumerate() {
        map.insert(col.name.clone(), cell_to_value(row, i, col.cell));
    }
    Value::Object(map)
}

fn cell_to_value(row: &SqliteRow, index: usize, cell: CellKind) -> Value {
    match cell {
        CellKind::Scalar(ColumnKind::Integer) => row
            .try_get_unchecked::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),
        CellKind::Scalar(ColumnKind::Real) => row
            .try_get_unchecked::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        CellKind::Scalar(ColumnKind::Boolean) => row
            .try_get_unchecked::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        CellKind::Scalar(ColumnKind::Text | ColumnKind::DateTime) | CellKind::Label => row
            .try_get_unchecked::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
        CellKind::Json => row
            .try_get_unchecked::<Option<String>, _>(index)
            .ok()
            .flatten()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_else(|| Value::Array(Vec::new())),
    }
}
