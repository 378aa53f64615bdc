//! Load config from the embedded inventory document or a JSON file, and resolve it into the runtime model.

use crate::config::resolved::{
    ColumnInfo, ColumnKind, ColumnPath, FormField, FormFieldKind, ListColumn, ManyToMany, ResolvedEntity,
    ResolvedModel, ResolvedView, ToOneRelation,
};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Page size when a view does not set one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

const INVENTORY_CONFIG: &str = include_str!("../../config/inventory.json");

/// The built-in inventory schema: suppliers, products, tags, staff and sales.
pub fn inventory_config() -> Result<FullConfig, ConfigError> {
    serde_json::from_str(INVENTORY_CONFIG).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Load a full config document from a JSON file.
pub async fn load_from_path(path: &Path) -> Result<FullConfig, ConfigError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}

/// Map a configured column type to (kind, SQL type, max length).
pub fn column_kind(table_id: &str, col: &ColumnConfig) -> Result<(ColumnKind, String, Option<u32>), ConfigError> {
    let name = col.type_.name().to_lowercase();
    let params = col.type_.params();
    let kind = match name.as_str() {
        "integer" | "int" | "bigint" | "smallint" => ColumnKind::Integer,
        "real" | "float" | "double" | "numeric" => ColumnKind::Real,
        "text" | "varchar" | "string" | "unicode" => ColumnKind::Text,
        "boolean" | "bool" => ColumnKind::Boolean,
        "datetime" | "timestamp" => ColumnKind::DateTime,
        _ => {
            return Err(ConfigError::UnknownColumnType {
                table_id: table_id.to_string(),
                column: col.name.clone(),
                type_name: col.type_.name().to_string(),
            })
        }
    };
    let max_length = match kind {
        ColumnKind::Text => params.first().copied(),
        _ => None,
    };
    let sql_type = match (kind, max_length) {
        (ColumnKind::Integer, _) => "INTEGER".to_string(),
        (ColumnKind::Real, _) => "REAL".to_string(),
        (ColumnKind::Text, Some(n)) => format!("VARCHAR({})", n),
        (ColumnKind::Text, None) => "TEXT".to_string(),
        (ColumnKind::Boolean, _) => "BOOLEAN".to_string(),
        (ColumnKind::DateTime, _) => "DATETIME".to_string(),
    };
    Ok((kind, sql_type, max_length))
}

/// Build resolved model from full config. Validates first.
pub fn resolve(config: &FullConfig) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;

    let columns_by_table: HashMap<&str, Vec<&ColumnConfig>> =
        config.columns.iter().fold(HashMap::new(), |mut m, c| {
            m.entry(c.table_id.as_str()).or_default().push(c);
            m
        });

    let mut entities = HashMap::new();
    for table in &config.tables {
        let table_columns = columns_by_table.get(table.id.as_str()).map(|v| v.as_slice()).unwrap_or(&[]);
        let mut columns = Vec::with_capacity(table_columns.len());
        for c in table_columns {
            let (kind, sql_type, max_length) = column_kind(&table.id, c)?;
            columns.push(ColumnInfo {
                name: c.name.clone(),
                kind,
                sql_type,
                is_pk: c.name == table.primary_key,
                nullable: c.nullable && c.name != table.primary_key,
                unique: c.unique,
                has_default: c.default.is_some(),
                generated: c.generated.clone(),
                max_length,
            });
        }

        let relations = config
            .relationships
            .iter()
            .filter(|r| r.from_table_id == table.id)
            .map(|r| ToOneRelation {
                name: r.name.clone(),
                fk_column: r.from_column.clone(),
                related_table_id: r.to_table_id.clone(),
                their_key: r.to_column.clone(),
                on_delete: r.on_delete.clone(),
            })
            .collect();
        let many_to_many = config
            .junctions
            .iter()
            .filter(|j| j.left_table_id == table.id)
            .map(|j| ManyToMany {
                name: j.name.clone(),
                junction_table: j.table.clone(),
                our_key: j.left_column.clone(),
                their_key: j.right_column.clone(),
                related_table_id: j.right_table_id.clone(),
            })
            .collect();

        entities.insert(
            table.id.clone(),
            ResolvedEntity {
                table_id: table.id.clone(),
                table_name: table.name.clone(),
                pk_column: table.primary_key.clone(),
                columns,
                relations,
                many_to_many,
                // Placeholder until every entity exists; labels may point through relations.
                label: ColumnPath::Column(table.primary_key.clone()),
            },
        );
    }

    let labels_by_table: HashMap<&str, &str> =
        config.tables.iter().map(|t| (t.id.as_str(), t.label.as_str())).collect();
    for table in &config.tables {
        let entity = &entities[&table.id];
        let label = resolve_path(&entities, entity, &table.label)?;
        match &label {
            ColumnPath::Column(_) => {}
            ColumnPath::ToOne { relation, .. } => {
                // Labels nest at most one relation deep.
                let nested = entity
                    .to_one(relation)
                    .and_then(|r| labels_by_table.get(r.related_table_id.as_str()))
                    .map(|l| l.contains('.'))
                    .unwrap_or(true);
                if nested {
                    return Err(unresolved(&table.id, &table.label));
                }
            }
            ColumnPath::ManyToMany { .. } => return Err(unresolved(&table.id, &table.label)),
        }
        if let Some(entity) = entities.get_mut(&table.id) {
            entity.label = label;
        }
    }

    let mut views = Vec::with_capacity(config.views.len());
    let mut view_by_path = HashMap::new();
    for v in &config.views {
        let entity = entities.get(&v.entity_id).ok_or_else(|| ConfigError::MissingReference {
            kind: "table",
            id: v.entity_id.clone(),
        })?;
        let view = resolve_view(&entities, entity, v)?;
        view_by_path.insert(view.path_segment.clone(), views.len());
        views.push(view);
    }

    Ok(ResolvedModel {
        entities,
        views,
        view_by_path,
    })
}

fn unresolved(table_id: &str, path: &str) -> ConfigError {
    ConfigError::UnresolvedPath {
        table_id: table_id.to_string(),
        path: path.to_string(),
    }
}

/// Resolve `column` or `relation.column` against an entity.
fn resolve_path(
    entities: &HashMap<String, ResolvedEntity>,
    entity: &ResolvedEntity,
    path: &str,
) -> Result<ColumnPath, ConfigError> {
    let Some((relation, column)) = path.split_once('.') else {
        return entity
            .column(path)
            .map(|c| ColumnPath::Column(c.name.clone()))
            .ok_or_else(|| unresolved(&entity.table_id, path));
    };
    if let Some(rel) = entity.to_one(relation) {
        let related = entities
            .get(&rel.related_table_id)
            .ok_or_else(|| unresolved(&entity.table_id, path))?;
        if related.column(column).is_some() {
            return Ok(ColumnPath::ToOne {
                relation: relation.to_string(),
                column: column.to_string(),
            });
        }
    }
    if let Some(m2m) = entity.many(relation) {
        let related = entities
            .get(&m2m.related_table_id)
            .ok_or_else(|| unresolved(&entity.table_id, path))?;
        if related.column(column).is_some() {
            return Ok(ColumnPath::ManyToMany {
                relation: relation.to_string(),
                column: column.to_string(),
            });
        }
    }
    Err(unresolved(&entity.table_id, path))
}

fn resolve_view(
    entities: &HashMap<String, ResolvedEntity>,
    entity: &ResolvedEntity,
    v: &AdminViewConfig,
) -> Result<ResolvedView, ConfigError> {
    let searchable = v
        .column_searchable_list
        .iter()
        .map(|p| resolve_path(entities, entity, p))
        .collect::<Result<Vec<_>, _>>()?;

    let list_excluded: HashSet<&str> = v.column_exclude_list.iter().map(String::as_str).collect();
    let form_excluded: HashSet<&str> = v.form_excluded_columns.iter().map(String::as_str).collect();

    // Foreign key columns are replaced by their relation, in column order; associations come last.
    let mut list_columns = Vec::new();
    let mut form_fields = Vec::new();
    for c in &entity.columns {
        if c.is_pk {
            continue;
        }
        if let Some(rel) = entity.to_one_by_fk(&c.name) {
            if !list_excluded.contains(rel.name.as_str()) {
                list_columns.push(ListColumn::ToOne(rel.name.clone()));
            }
            if !form_excluded.contains(rel.name.as_str()) {
                form_fields.push(FormField {
                    name: rel.name.clone(),
                    kind: FormFieldKind::ToOne {
                        fk_column: c.name.clone(),
                        related: rel.related_table_id.clone(),
                    },
                    required: c.required(),
                    max_length: None,
                });
            }
            continue;
        }
        if !list_excluded.contains(c.name.as_str()) {
            list_columns.push(ListColumn::Scalar(c.name.clone()));
        }
        if c.generated.is_none() && !form_excluded.contains(c.name.as_str()) {
            form_fields.push(FormField {
                name: c.name.clone(),
                kind: FormFieldKind::Scalar { kind: c.kind },
                required: c.required(),
                max_length: c.max_length,
            });
        }
    }
    for m in &entity.many_to_many {
        if !list_excluded.contains(m.name.as_str()) {
            list_columns.push(ListColumn::ManyToMany(m.name.clone()));
        }
        if !form_excluded.contains(m.name.as_str()) {
            form_fields.push(FormField {
                name: m.name.clone(),
                kind: FormFieldKind::ManyToMany {
                    related: m.related_table_id.clone(),
                },
                required: false,
                max_length: None,
            });
        }
    }

    for col in &v.column_editable_list {
        let generated = entity.column(col).map(|c| c.generated.is_some()).unwrap_or(false);
        if generated || entity.column(col).map(|c| c.is_pk).unwrap_or(false) {
            return Err(ConfigError::Validation(format!(
                "view '{}' cannot edit read-only column '{}'",
                v.path_segment, col
            )));
        }
    }

    Ok(ResolvedView {
        name: v.name.clone().unwrap_or_else(|| entity.table_name.clone()),
        path_segment: v.path_segment.clone(),
        entity_id: entity.table_id.clone(),
        searchable,
        list_columns,
        form_fields,
        editable: v.column_editable_list.clone(),
        formatters: v.column_formatters.clone(),
        disallowed: v.action_disallowed_list.iter().copied().collect(),
        page_size: v.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    })
}
