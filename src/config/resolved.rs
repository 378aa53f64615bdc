//! Resolved entity model: config validated and flattened for runtime use.

use crate::config::{Action, Formatter};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Storage kind of a column; drives DDL, form coercion and row decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
    Boolean,
    DateTime,
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ColumnKind,
    /// SQL type used in DDL (e.g. "VARCHAR(255)").
    pub sql_type: String,
    pub is_pk: bool,
    pub nullable: bool,
    pub unique: bool,
    pub has_default: bool,
    /// Generated expression when the database computes the value.
    pub generated: Option<String>,
    /// Maximum character length for varchar columns.
    pub max_length: Option<u32>,
}

impl ColumnInfo {
    /// Whether a value must be supplied on insert.
    pub fn required(&self) -> bool {
        !self.nullable && !self.has_default && !self.is_pk && self.generated.is_none()
    }
}

/// We hold the foreign key; they are the referenced row.
#[derive(Clone, Debug)]
pub struct ToOneRelation {
    pub name: String,
    pub fk_column: String,
    pub related_table_id: String,
    pub their_key: String,
    pub on_delete: Option<String>,
}

/// Association through a junction table; we are the left side.
#[derive(Clone, Debug)]
pub struct ManyToMany {
    pub name: String,
    pub junction_table: String,
    /// Junction column referencing our primary key.
    pub our_key: String,
    /// Junction column referencing the related primary key.
    pub their_key: String,
    pub related_table_id: String,
}

/// Path to a column, possibly through a relation (`supplier.name`, `tags.name`).
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnPath {
    Column(String),
    ToOne { relation: String, column: String },
    ManyToMany { relation: String, column: String },
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub table_id: String,
    pub table_name: String,
    pub pk_column: String,
    pub columns: Vec<ColumnInfo>,
    pub relations: Vec<ToOneRelation>,
    pub many_to_many: Vec<ManyToMany>,
    /// Row label; a plain column or a to-one path.
    pub label: ColumnPath,
}

impl ResolvedEntity {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn to_one(&self, name: &str) -> Option<&ToOneRelation> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn to_one_by_fk(&self, fk_column: &str) -> Option<&ToOneRelation> {
        self.relations.iter().find(|r| r.fk_column == fk_column)
    }

    pub fn many(&self, name: &str) -> Option<&ManyToMany> {
        self.many_to_many.iter().find(|m| m.name == name)
    }
}

/// A column of the list view.
#[derive(Clone, Debug, PartialEq)]
pub enum ListColumn {
    Scalar(String),
    /// Rendered as the related row's label.
    ToOne(String),
    /// Rendered as the list of related labels.
    ManyToMany(String),
}

impl ListColumn {
    pub fn name(&self) -> &str {
        match self {
            ListColumn::Scalar(n) | ListColumn::ToOne(n) | ListColumn::ManyToMany(n) => n,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormFieldKind {
    Scalar { kind: ColumnKind },
    /// Select one related row; stored in `fk_column`.
    ToOne { fk_column: String, related: String },
    /// Select many related rows.
    ManyToMany { related: String },
}

#[derive(Clone, Debug, Serialize)]
pub struct FormField {
    pub name: String,
    #[serde(flatten)]
    pub kind: FormFieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct ResolvedView {
    pub name: String,
    pub path_segment: String,
    pub entity_id: String,
    pub searchable: Vec<ColumnPath>,
    pub list_columns: Vec<ListColumn>,
    pub form_fields: Vec<FormField>,
    pub editable: Vec<String>,
    pub formatters: HashMap<String, Formatter>,
    pub disallowed: HashSet<Action>,
    pub page_size: u32,
}

impl ResolvedView {
    pub fn allows(&self, action: Action) -> bool {
        !self.disallowed.contains(&action)
    }

    pub fn form_field(&self, name: &str) -> Option<&FormField> {
        self.form_fields.iter().find(|f| f.name == name)
    }

    pub fn list_column(&self, name: &str) -> Option<&ListColumn> {
        self.list_columns.iter().find(|c| c.name() == name)
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    pub entities: HashMap<String, ResolvedEntity>,
    /// Views in registration order.
    pub views: Vec<ResolvedView>,
    pub view_by_path: HashMap<String, usize>,
}

impl ResolvedModel {
    pub fn entity(&self, table_id: &str) -> Option<&ResolvedEntity> {
        self.entities.get(table_id)
    }

    pub fn view_index(&self, path: &str) -> Option<usize> {
        self.view_by_path.get(path).copied()
    }

    pub fn view_by_path(&self, path: &str) -> Option<&ResolvedView> {
        self.view_index(path).and_then(|i| self.views.get(i))
    }
}
