//! Resolved entity model: catalog validated and flattened for runtime use.

use crate::config::{Check, EnumConfig, ErrorStyle, Operation, Returning};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Storage type of a column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Uuid,
    Text,
    Integer,
    Double,
    Boolean,
    Timestamp,
    /// Named enum type from the catalog.
    Enum(String),
}

impl ColumnKind {
    /// PostgreSQL type used for DDL and parameter casts.
    pub fn pg_type(&self, schema: &str) -> String {
        match self {
            ColumnKind::Uuid => "uuid".into(),
            ColumnKind::Text => "text".into(),
            ColumnKind::Integer => "int4".into(),
            ColumnKind::Double => "float8".into(),
            ColumnKind::Boolean => "bool".into(),
            ColumnKind::Timestamp => "timestamptz".into(),
            ColumnKind::Enum(name) => format!("\"{}\".\"{}\"", schema, name),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ForeignKey {
    pub entity_id: String,
    pub table: String,
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    /// API (camelCase) name.
    pub name: String,
    /// Storage (snake_case) name.
    pub column: String,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub primary_key: bool,
    pub references: Option<ForeignKey>,
}

/// Where a validated value comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Location {
    Body,
    Params,
    Query,
}

impl Location {
    pub fn as_str(self) -> &'static str {
        match self {
            Location::Body => "body",
            Location::Params => "params",
            Location::Query => "query",
        }
    }
}

#[derive(Clone, Debug)]
pub struct FieldRule {
    pub field: String,
    pub check: Check,
    pub optional: bool,
    pub location: Location,
}

impl FieldRule {
    /// Required UUID rule for the `:id` path parameter.
    pub fn path_id() -> Self {
        FieldRule {
            field: "id".into(),
            check: Check::Uuid,
            optional: false,
            location: Location::Params,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub id: String,
    pub table_name: String,
    pub path_segment: String,
    pub mounted: bool,
    pub not_found_message: String,
    pub error_style: ErrorStyle,
    /// Declared columns followed by the audit columns; `id` first.
    pub columns: Vec<ColumnInfo>,
    pub list_filters: Vec<FieldRule>,
    pub create_rules: Vec<FieldRule>,
    pub create_writable: Vec<String>,
    pub create_defaults: Map<String, Value>,
    pub returning: Returning,
    pub update_rules: Vec<FieldRule>,
    pub update_writable: Vec<String>,
    pub check_id: Vec<Operation>,
    pub projection: Option<Vec<String>>,
}

impl ResolvedEntity {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn checks_id(&self, op: Operation) -> bool {
        self.check_id.contains(&op)
    }

    /// Narrow a stored row to the entity's projection, in projection order.
    pub fn project(&self, mut row: Map<String, Value>) -> Map<String, Value> {
        match &self.projection {
            None => row,
            Some(fields) => fields
                .iter()
                .filter_map(|f| row.remove(f).map(|v| (f.clone(), v)))
                .collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    /// Every entity in dependency order, routable or not.
    pub entities: Vec<ResolvedEntity>,
    /// Routable entities keyed by path segment.
    pub entity_by_path: HashMap<String, ResolvedEntity>,
    pub enums: Vec<EnumConfig>,
}

impl ResolvedModel {
    pub fn entity_by_path(&self, path: &str) -> Option<&ResolvedEntity> {
        self.entity_by_path.get(path)
    }

    pub fn entity(&self, id: &str) -> Option<&ResolvedEntity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn enum_values(&self, name: &str) -> Option<&[String]> {
        self.enums.iter().find(|e| e.name == name).map(|e| e.values.as_slice())
    }

    /// Path segments currently routable, in catalog order.
    pub fn mounted_paths(&self) -> Vec<&str> {
        self.entities
            .iter()
            .filter(|e| self.entity_by_path.contains_key(&e.path_segment))
            .map(|e| e.path_segment.as_str())
            .collect()
    }
}
