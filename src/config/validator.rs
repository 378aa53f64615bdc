//! Config validation: referential integrity and view consistency.

use crate::config::{column_kind, ColumnKind, FullConfig};
use crate::error::ConfigError;
use std::collections::{HashMap, HashSet};

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    let mut table_ids = HashSet::new();
    for t in &config.tables {
        if !table_ids.insert(t.id.as_str()) {
            return Err(ConfigError::Validation(format!("duplicate table id '{}'", t.id)));
        }
    }

    let mut columns_by_table: HashMap<&str, HashSet<&str>> = HashMap::new();
    for c in &config.columns {
        if !table_ids.contains(c.table_id.as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "table",
                id: c.table_id.clone(),
            });
        }
        if !columns_by_table.entry(c.table_id.as_str()).or_default().insert(c.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate column '{}' on table '{}'",
                c.name, c.table_id
            )));
        }
        let (kind, _, _) = column_kind(&c.table_id, c)?;
        if c.generated.is_some() && c.default.is_some() {
            return Err(ConfigError::Validation(format!(
                "generated column '{}.{}' cannot have a default",
                c.table_id, c.name
            )));
        }
        if kind == ColumnKind::Boolean && c.unique {
            return Err(ConfigError::Validation(format!(
                "boolean column '{}.{}' cannot be unique",
                c.table_id, c.name
            )));
        }
    }

    for t in &config.tables {
        let pk = config
            .columns
            .iter()
            .find(|c| c.table_id == t.id && c.name == t.primary_key)
            .ok_or_else(|| ConfigError::InvalidPrimaryKey {
                table_id: t.id.clone(),
                column: t.primary_key.clone(),
            })?;
        let (kind, _, _) = column_kind(&t.id, pk)?;
        if kind != ColumnKind::Integer {
            return Err(ConfigError::InvalidPrimaryKey {
                table_id: t.id.clone(),
                column: t.primary_key.clone(),
            });
        }
    }

    let has_column = |table: &str, column: &str| {
        columns_by_table
            .get(table)
            .map(|cols| cols.contains(column))
            .unwrap_or(false)
    };

    // Relation accessors share a namespace with the owning table's columns.
    let mut accessors: HashSet<(&str, &str)> = HashSet::new();
    for r in &config.relationships {
        if !table_ids.contains(r.from_table_id.as_str())
            || !table_ids.contains(r.to_table_id.as_str())
            || !has_column(&r.from_table_id, &r.from_column)
            || !has_column(&r.to_table_id, &r.to_column)
        {
            return Err(ConfigError::MissingReference {
                kind: "relationship",
                id: r.id.clone(),
            });
        }
        if has_column(&r.from_table_id, &r.name) || !accessors.insert((r.from_table_id.as_str(), r.name.as_str())) {
            return Err(ConfigError::Validation(format!(
                "relationship name '{}' clashes on table '{}'",
                r.name, r.from_table_id
            )));
        }
    }

    for j in &config.junctions {
        if !table_ids.contains(j.left_table_id.as_str()) || !table_ids.contains(j.right_table_id.as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "junction",
                id: j.id.clone(),
            });
        }
        if j.left_column == j.right_column {
            return Err(ConfigError::Validation(format!(
                "junction '{}' needs two distinct key columns",
                j.id
            )));
        }
        if has_column(&j.left_table_id, &j.name) || !accessors.insert((j.left_table_id.as_str(), j.name.as_str())) {
            return Err(ConfigError::Validation(format!(
                "junction name '{}' clashes on table '{}'",
                j.name, j.left_table_id
            )));
        }
    }

    let mut path_segments = HashSet::new();
    for v in &config.views {
        if !table_ids.contains(v.entity_id.as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "table",
                id: v.entity_id.clone(),
            });
        }
        if !path_segments.insert(v.path_segment.as_str()) {
            return Err(ConfigError::DuplicatePathSegment(v.path_segment.clone()));
        }
        if v.page_size == Some(0) {
            return Err(ConfigError::Validation(format!(
                "view '{}' page_size must be positive",
                v.path_segment
            )));
        }
        for col in v.column_formatters.keys() {
            if !has_column(&v.entity_id, col) {
                return Err(ConfigError::MissingReference {
                    kind: "formatter column",
                    id: format!("{}.{}", v.entity_id, col),
                });
            }
        }
        for col in &v.column_editable_list {
            if !has_column(&v.entity_id, col) && !accessors.contains(&(v.entity_id.as_str(), col.as_str())) {
                return Err(ConfigError::MissingReference {
                    kind: "editable column",
                    id: format!("{}.{}", v.entity_id, col),
                });
            }
        }
    }

    Ok(())
}
