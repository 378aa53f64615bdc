//! Builds parameterized SELECT, INSERT, UPDATE, DELETE for SQLite from the resolved model.

use crate::config::{
    ColumnKind, ColumnPath, ListColumn, ManyToMany, ResolvedEntity, ResolvedModel, ResolvedView, ToOneRelation,
};
use serde_json::Value;

/// Alias of the entity's own table in list and details queries.
const MAIN_ALIAS: &str = "main";

/// Hard cap on rows returned by one list query.
pub const MAX_LIMIT: u32 = 1000;

/// Quote identifier for SQLite (safe: only from config).
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// How a result column is decoded into JSON.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CellKind {
    Scalar(ColumnKind),
    /// Display label (text).
    Label,
    /// JSON text produced by SQLite's json functions.
    Json,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OutputColumn {
    pub name: String,
    pub cell: CellKind,
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
    /// Result columns in select order; empty for statements without rows.
    pub shape: Vec<OutputColumn>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf::default()
    }

    /// Push a parameter, returning its `?N` placeholder.
    fn push_param(&mut self, v: Value) -> String {
        self.params.push(v);
        format!("?{}", self.params.len())
    }

    fn output(&mut self, name: &str, cell: CellKind) {
        self.shape.push(OutputColumn {
            name: name.to_string(),
            cell,
        });
    }
}

/// List request after parsing: free-text search, exact filters, sort, window.
#[derive(Clone, Debug, Default)]
pub struct ListQuery {
    pub search: Option<String>,
    pub filters: Vec<(String, Value)>,
    pub sort: Option<String>,
    pub desc: bool,
    pub limit: u32,
    pub offset: u32,
}

fn related_one<'a>(
    model: &'a ResolvedModel,
    entity: &'a ResolvedEntity,
    relation: &str,
) -> Option<(&'a ToOneRelation, &'a ResolvedEntity)> {
    let rel = entity.to_one(relation)?;
    Some((rel, model.entity(&rel.related_table_id)?))
}

fn related_many<'a>(
    model: &'a ResolvedModel,
    entity: &'a ResolvedEntity,
    relation: &str,
) -> Option<(&'a ManyToMany, &'a ResolvedEntity)> {
    let m2m = entity.many(relation)?;
    Some((m2m, model.entity(&m2m.related_table_id)?))
}

/// SQL expression for the label of the `entity` row aliased `alias`.
pub fn label_expr(model: &ResolvedModel, entity: &ResolvedEntity, alias: &str) -> String {
    match &entity.label {
        ColumnPath::Column(c) => format!("{}.{}", alias, quoted(c)),
        ColumnPath::ToOne { relation, column } => match related_one(model, entity, relation) {
            Some((rel, related)) => {
                let inner = format!("{}_l", alias);
                format!(
                    "(SELECT {inner}.{} FROM {} {inner} WHERE {inner}.{} = {}.{})",
                    quoted(column),
                    quoted(&related.table_name),
                    quoted(&rel.their_key),
                    alias,
                    quoted(&rel.fk_column),
                )
            }
            None => "NULL".into(),
        },
        ColumnPath::ManyToMany { .. } => "NULL".into(),
    }
}

/// Scalar subquery yielding the label of the row referenced by `rel`.
fn to_one_label_subquery(model: &ResolvedModel, rel: &ToOneRelation, related: &ResolvedEntity, alias: &str) -> String {
    format!(
        "(SELECT {} FROM {} {alias} WHERE {alias}.{} = {}.{})",
        label_expr(model, related, alias),
        quoted(&related.table_name),
        quoted(&rel.their_key),
        MAIN_ALIAS,
        quoted(&rel.fk_column),
    )
}

/// Scalar subquery yielding a JSON array over the associated rows, ordered by label.
/// `with_ids` yields `{id, label}` objects instead of bare labels.
fn many_subquery(
    model: &ResolvedModel,
    owner: &ResolvedEntity,
    m2m: &ManyToMany,
    related: &ResolvedEntity,
    alias: &str,
    with_ids: bool,
) -> String {
    let junction = format!("{}_j", alias);
    let label = label_expr(model, related, alias);
    let id = format!("{}.{}", alias, quoted(&related.pk_column));
    let item = if with_ids {
        format!("json_object('id', {}, 'label', {})", id, label)
    } else {
        label.clone()
    };
    format!(
        "(SELECT json_group_array({} ORDER BY {}, {}) FROM {} {junction} JOIN {} {alias} ON {} = {junction}.{} WHERE {junction}.{} = {}.{})",
        item,
        label,
        id,
        quoted(&m2m.junction_table),
        quoted(&related.table_name),
        id,
        quoted(&m2m.their_key),
        quoted(&m2m.our_key),
        MAIN_ALIAS,
        quoted(&owner.pk_column),
    )
}

fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Match expression for one searchable path against placeholder `ph`.
fn search_expr(model: &ResolvedModel, entity: &ResolvedEntity, path: &ColumnPath, ph: &str) -> Option<String> {
    Some(match path {
        ColumnPath::Column(c) => format!("CAST({}.{} AS TEXT) LIKE {} ESCAPE '\\'", MAIN_ALIAS, quoted(c), ph),
        ColumnPath::ToOne { relation, column } => {
            let (rel, related) = related_one(model, entity, relation)?;
            format!(
                "EXISTS (SELECT 1 FROM {} s WHERE s.{} = {}.{} AND CAST(s.{} AS TEXT) LIKE {} ESCAPE '\\')",
                quoted(&related.table_name),
                quoted(&rel.their_key),
                MAIN_ALIAS,
                quoted(&rel.fk_column),
                quoted(column),
                ph
            )
        }
        ColumnPath::ManyToMany { relation, column } => {
            let (m2m, related) = related_many(model, entity, relation)?;
            format!(
                "EXISTS (SELECT 1 FROM {} sj JOIN {} s ON s.{} = sj.{} WHERE sj.{} = {}.{} AND CAST(s.{} AS TEXT) LIKE {} ESCAPE '\\')",
                quoted(&m2m.junction_table),
                quoted(&related.table_name),
                quoted(&related.pk_column),
                quoted(&m2m.their_key),
                quoted(&m2m.our_key),
                MAIN_ALIAS,
                quoted(&entity.pk_column),
                quoted(column),
                ph
            )
        }
    })
}

/// WHERE clause shared by list and count: every search term must match some searchable path; filters are exact.
fn list_where(q: &mut QueryBuf, model: &ResolvedModel, view: &ResolvedView, entity: &ResolvedEntity, list: &ListQuery) -> String {
    let mut where_parts = Vec::new();
    if let Some(search) = list.search.as_deref() {
        if !view.searchable.is_empty() {
            for term in search.split_whitespace() {
                let ph = q.push_param(Value::String(like_pattern(term)));
                let alternatives: Vec<String> = view
                    .searchable
                    .iter()
                    .filter_map(|p| search_expr(model, entity, p, &ph))
                    .collect();
                if !alternatives.is_empty() {
                    where_parts.push(format!("({})", alternatives.join(" OR ")));
                }
            }
        }
    }
    for (col, val) in &list.filters {
        if entity.column(col).is_some() {
            let ph = q.push_param(val.clone());
            where_parts.push(format!("{}.{} = {}", MAIN_ALIAS, quoted(col), ph));
        }
    }
    if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    }
}

/// SELECT a page of the list view: primary key, list columns, relation labels; ORDER BY sort column then pk.
pub fn select_list(model: &ResolvedModel, view: &ResolvedView, entity: &ResolvedEntity, list: &ListQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = quoted(&entity.pk_column);
    let mut select_parts = vec![format!("{}.{} AS {}", MAIN_ALIAS, pk, pk)];
    q.output(&entity.pk_column, CellKind::Scalar(ColumnKind::Integer));

    for (i, col) in view.list_columns.iter().enumerate() {
        match col {
            ListColumn::Scalar(name) => {
                let Some(info) = entity.column(name) else { continue };
                select_parts.push(format!("{}.{} AS {}", MAIN_ALIAS, quoted(name), quoted(name)));
                q.output(name, CellKind::Scalar(info.kind));
            }
            ListColumn::ToOne(name) => {
                let Some((rel, related)) = related_one(model, entity, name) else { continue };
                let sub = to_one_label_subquery(model, rel, related, &format!("r{}", i));
                select_parts.push(format!("{} AS {}", sub, quoted(name)));
                q.output(name, CellKind::Label);
            }
            ListColumn::ManyToMany(name) => {
                let Some((m2m, related)) = related_many(model, entity, name) else { continue };
                let sub = many_subquery(model, entity, m2m, related, &format!("m{}", i), false);
                select_parts.push(format!("{} AS {}", sub, quoted(name)));
                q.output(name, CellKind::Json);
            }
        }
    }

    let where_clause = list_where(&mut q, model, view, entity, list);

    let sort_expr = list.sort.as_deref().and_then(|s| match view.list_column(s)? {
        ListColumn::Scalar(name) => Some(format!("{}.{}", MAIN_ALIAS, quoted(name))),
        ListColumn::ToOne(name) => {
            let (rel, related) = related_one(model, entity, name)?;
            Some(to_one_label_subquery(model, rel, related, "o"))
        }
        ListColumn::ManyToMany(_) => None,
    });
    let direction = if list.desc { " DESC" } else { "" };
    let order_clause = match sort_expr {
        Some(expr) => format!(" ORDER BY {}{}, {}.{}", expr, direction, MAIN_ALIAS, pk),
        None => format!(" ORDER BY {}.{}", MAIN_ALIAS, pk),
    };

    q.sql = format!(
        "SELECT {} FROM {} {}{}{} LIMIT {} OFFSET {}",
        select_parts.join(", "),
        quoted(&entity.table_name),
        MAIN_ALIAS,
        where_clause,
        order_clause,
        list.limit.min(MAX_LIMIT),
        list.offset
    );
    q
}

/// SELECT COUNT(*) with the same WHERE as `select_list`.
pub fn count_list(model: &ResolvedModel, view: &ResolvedView, entity: &ResolvedEntity, list: &ListQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = list_where(&mut q, model, view, entity, list);
    q.sql = format!(
        "SELECT COUNT(*) FROM {} {}{}",
        quoted(&entity.table_name),
        MAIN_ALIAS,
        where_clause
    );
    q
}

/// SELECT one row by primary key: every column, to-one labels keyed by relation name, associations as `{id, label}` arrays.
pub fn select_details(model: &ResolvedModel, entity: &ResolvedEntity, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut select_parts = Vec::new();
    for c in &entity.columns {
        select_parts.push(format!("{}.{} AS {}", MAIN_ALIAS, quoted(&c.name), quoted(&c.name)));
        q.output(&c.name, CellKind::Scalar(c.kind));
    }
    for (i, rel) in entity.relations.iter().enumerate() {
        let Some(related) = model.entity(&rel.related_table_id) else { continue };
        let sub = to_one_label_subquery(model, rel, related, &format!("r{}", i));
        select_parts.push(format!("{} AS {}", sub, quoted(&rel.name)));
        q.output(&rel.name, CellKind::Label);
    }
    for (i, m2m) in entity.many_to_many.iter().enumerate() {
        let Some(related) = model.entity(&m2m.related_table_id) else { continue };
        let sub = many_subquery(model, entity, m2m, related, &format!("m{}", i), true);
        select_parts.push(format!("{} AS {}", sub, quoted(&m2m.name)));
        q.output(&m2m.name, CellKind::Json);
    }
    let ph = q.push_param(Value::from(id));
    q.sql = format!(
        "SELECT {} FROM {} {} WHERE {}.{} = {}",
        select_parts.join(", "),
        quoted(&entity.table_name),
        MAIN_ALIAS,
        MAIN_ALIAS,
        quoted(&entity.pk_column),
        ph
    );
    q
}

/// SELECT 1 when the row exists.
pub fn select_exists(entity: &ResolvedEntity, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(Value::from(id));
    q.sql = format!(
        "SELECT 1 FROM {} WHERE {} = {}",
        quoted(&entity.table_name),
        quoted(&entity.pk_column),
        ph
    );
    q
}

/// Choices for a relation field: `(id, label)` of every related row, optionally filtered by label substring.
pub fn select_choices(model: &ResolvedModel, related: &ResolvedEntity, query: Option<&str>, limit: u32) -> QueryBuf {
    let mut q = QueryBuf::new();
    let alias = "c";
    let label = label_expr(model, related, alias);
    let where_clause = match query.map(str::trim).filter(|s| !s.is_empty()) {
        Some(term) => {
            let ph = q.push_param(Value::String(like_pattern(term)));
            format!(" WHERE CAST({} AS TEXT) LIKE {} ESCAPE '\\'", label, ph)
        }
        None => String::new(),
    };
    q.output("id", CellKind::Scalar(ColumnKind::Integer));
    q.output("label", CellKind::Label);
    q.sql = format!(
        "SELECT {alias}.{} AS \"id\", {} AS \"label\" FROM {} {alias}{} ORDER BY 2, 1 LIMIT {}",
        quoted(&related.pk_column),
        label,
        quoted(&related.table_name),
        where_clause,
        limit.min(MAX_LIMIT)
    );
    q
}

/// INSERT the given column values; returns the new primary key.
pub fn insert(entity: &ResolvedEntity, values: &[(String, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = quoted(&entity.table_name);
    let pk = quoted(&entity.pk_column);
    if values.is_empty() {
        q.sql = format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, pk);
        return q;
    }
    let mut cols = Vec::with_capacity(values.len());
    let mut placeholders = Vec::with_capacity(values.len());
    for (name, val) in values {
        cols.push(quoted(name));
        placeholders.push(q.push_param(val.clone()));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        table,
        cols.join(", "),
        placeholders.join(", "),
        pk
    );
    q
}

/// UPDATE by id: SET only the given columns. Caller skips the statement when there is nothing to set.
pub fn update(entity: &ResolvedEntity, id: i64, values: &[(String, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::with_capacity(values.len());
    for (name, val) in values {
        if *name == entity.pk_column {
            continue;
        }
        let ph = q.push_param(val.clone());
        sets.push(format!("{} = {}", quoted(name), ph));
    }
    let id_ph = q.push_param(Value::from(id));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        quoted(&entity.table_name),
        sets.join(", "),
        quoted(&entity.pk_column),
        id_ph
    );
    q
}

/// DELETE by id.
pub fn delete(entity: &ResolvedEntity, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(Value::from(id));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        quoted(&entity.table_name),
        quoted(&entity.pk_column),
        ph
    );
    q
}

/// DELETE every association of one owner row.
pub fn junction_clear(m2m: &ManyToMany, owner_id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(Value::from(owner_id));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        quoted(&m2m.junction_table),
        quoted(&m2m.our_key),
        ph
    );
    q
}

/// INSERT one association, ignoring an existing identical pair.
pub fn junction_insert(m2m: &ManyToMany, owner_id: i64, related_id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let owner = q.push_param(Value::from(owner_id));
    let related = q.push_param(Value::from(related_id));
    q.sql = format!(
        "INSERT OR IGNORE INTO {} ({}, {}) VALUES ({}, {})",
        quoted(&m2m.junction_table),
        quoted(&m2m.our_key),
        quoted(&m2m.their_key),
        owner,
        related
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{inventory_config, resolve};
    use serde_json::json;

    fn model() -> ResolvedModel {
        resolve(&inventory_config().unwrap()).unwrap()
    }

    #[test]
    fn search_terms_are_anded_and_paths_ored() {
        let m = model();
        let view = m.view_by_path("product").unwrap();
        let entity = m.entity("product").unwrap();
        let list = ListQuery {
            search: Some("acme  bolt".into()),
            limit: 100,
            ..Default::default()
        };
        let q = select_list(&m, view, entity, &list);
        assert_eq!(q.params, vec![json!("%acme%"), json!("%bolt%")]);
        assert!(q.sql.contains("CAST(main.\"name\" AS TEXT) LIKE ?1"));
        assert!(q.sql.contains("FROM \"supplier\" s WHERE s.\"id\" = main.\"supplier_id\""));
        assert!(q.sql.contains("FROM \"product_tags\" sj JOIN \"tag\" s"));
        assert!(q.sql.contains(") AND ("));
        assert!(q.sql.ends_with("ORDER BY main.\"id\" LIMIT 100 OFFSET 0"));
    }

    #[test]
    fn like_wildcards_in_terms_are_escaped() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn list_shape_follows_list_columns() {
        let m = model();
        let view = m.view_by_path("sale").unwrap();
        let entity = m.entity("sale").unwrap();
        let q = select_list(&m, view, entity, &ListQuery { limit: 20, ..Default::default() });
        let names: Vec<_> = q.shape.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["id", "quantity", "date", "product", "staff", "sold_price"]);
        assert_eq!(q.shape[3].cell, CellKind::Label);
        assert!(q.params.is_empty());
    }

    #[test]
    fn sort_by_relation_orders_by_label() {
        let m = model();
        let view = m.view_by_path("product").unwrap();
        let entity = m.entity("product").unwrap();
        let list = ListQuery {
            sort: Some("supplier".into()),
            desc: true,
            limit: 10,
            ..Default::default()
        };
        let q = select_list(&m, view, entity, &list);
        assert!(q.sql.contains("ORDER BY (SELECT o.\"name\" FROM \"supplier\" o WHERE o.\"id\" = main.\"supplier_id\") DESC, main.\"id\""));
    }

    #[test]
    fn unknown_sort_and_filter_columns_are_ignored() {
        let m = model();
        let view = m.view_by_path("tag").unwrap();
        let entity = m.entity("tag").unwrap();
        let list = ListQuery {
            sort: Some("nope".into()),
            filters: vec![("nope".into(), json!(1)), ("name".into(), json!("red"))],
            limit: 5,
            ..Default::default()
        };
        let q = select_list(&m, view, entity, &list);
        assert_eq!(q.params, vec![json!("red")]);
        assert!(q.sql.contains("WHERE main.\"name\" = ?1 ORDER BY main.\"id\""));
    }

    #[test]
    fn sale_label_goes_through_product() {
        let m = model();
        let sale = m.entity("sale").unwrap();
        assert_eq!(
            label_expr(&m, sale, "x"),
            "(SELECT x_l.\"fullname\" FROM \"product\" x_l WHERE x_l.\"id\" = x.\"product_id\")"
        );
    }

    #[test]
    fn insert_without_values_uses_defaults() {
        let m = model();
        let tag = m.entity("tag").unwrap();
        assert_eq!(insert(tag, &[]).sql, "INSERT INTO \"tag\" DEFAULT VALUES RETURNING \"id\"");
        let q = insert(tag, &[("name".into(), json!("red"))]);
        assert_eq!(q.sql, "INSERT INTO \"tag\" (\"name\") VALUES (?1) RETURNING \"id\"");
    }

    #[test]
    fn update_never_sets_primary_key() {
        let m = model();
        let tag = m.entity("tag").unwrap();
        let q = update(tag, 7, &[("id".into(), json!(9)), ("name".into(), json!("blue"))]);
        assert_eq!(q.sql, "UPDATE \"tag\" SET \"name\" = ?1 WHERE \"id\" = ?2");
        assert_eq!(q.params, vec![json!("blue"), json!(7)]);
    }
}
