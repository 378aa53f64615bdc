//! Raw config types matching the JSON schema document (tables, columns, relationships, junctions, admin views).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableConfig {
    pub id: String,
    pub name: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// Display label of a row: a column name or a `relation.column` path.
    pub label: String,
    #[serde(default)]
    pub comment: Option<String>,
}

fn default_primary_key() -> String {
    "id".into()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnTypeConfig {
    Simple(String),
    Parameterized { name: String, params: Option<Vec<u32>> },
}

impl ColumnTypeConfig {
    pub fn name(&self) -> &str {
        match self {
            ColumnTypeConfig::Simple(s) => s.as_str(),
            ColumnTypeConfig::Parameterized { name, .. } => name.as_str(),
        }
    }

    pub fn params(&self) -> &[u32] {
        match self {
            ColumnTypeConfig::Simple(_) => &[],
            ColumnTypeConfig::Parameterized { params, .. } => params.as_deref().unwrap_or(&[]),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub table_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub type_: ColumnTypeConfig,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    /// SQL expression used as the column DEFAULT.
    #[serde(default)]
    pub default: Option<String>,
    /// SQL expression for a database-computed (generated) column. Generated columns are read-only.
    #[serde(default)]
    pub generated: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Many-to-one foreign key: `from_table.from_column` references `to_table.to_column`.
/// `name` is the relation accessor used in views (e.g. `supplier` for `product.supplier_id`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationshipConfig {
    pub id: String,
    pub name: String,
    pub from_table_id: String,
    pub from_column: String,
    pub to_table_id: String,
    pub to_column: String,
    #[serde(default)]
    pub on_delete: Option<String>,
}

/// Many-to-many association realised by a junction table with no attributes of its own.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JunctionConfig {
    pub id: String,
    /// Accessor on the left table (e.g. `tags` on product).
    pub name: String,
    /// Junction table name.
    pub table: String,
    pub left_table_id: String,
    pub left_column: String,
    pub right_table_id: String,
    pub right_column: String,
}

/// Admin action that a view may disallow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Edit,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Formatter {
    Currency,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdminViewConfig {
    pub entity_id: String,
    pub path_segment: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub column_searchable_list: Vec<String>,
    /// Columns hidden from the list view. Unknown names are ignored.
    #[serde(default)]
    pub column_exclude_list: Vec<String>,
    /// Columns hidden from create/edit forms. Unknown names are ignored.
    #[serde(default)]
    pub form_excluded_columns: Vec<String>,
    /// Columns editable inline from the list view.
    #[serde(default)]
    pub column_editable_list: Vec<String>,
    #[serde(default)]
    pub column_formatters: HashMap<String, Formatter>,
    #[serde(default)]
    pub action_disallowed_list: Vec<Action>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

/// All config types in one document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FullConfig {
    #[serde(default)]
    pub tables: Vec<TableConfig>,
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
    #[serde(default)]
    pub relationships: Vec<RelationshipConfig>,
    #[serde(default)]
    pub junctions: Vec<JunctionConfig>,
    #[serde(default)]
    pub views: Vec<AdminViewConfig>,
}
