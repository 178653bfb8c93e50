//! Raw catalog types matching the embedded JSON entity catalog.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnumConfig {
    pub name: String,
    pub values: Vec<String>,
}

/// Column type as written in the catalog: `"text"`, `"uuid"`, ... or `{ "enum": "user_role" }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnTypeConfig {
    Simple(String),
    Enum {
        #[serde(rename = "enum")]
        name: String,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// API (camelCase) name; the storage column is its snake_case form.
    pub name: String,
    #[serde(rename = "type")]
    pub type_: ColumnTypeConfig,
    #[serde(default)]
    pub nullable: bool,
    /// Entity id this column points at (foreign key to its `id`).
    #[serde(default)]
    pub references: Option<String>,
}

/// Type rule applied to a request field before it reaches the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    String,
    Boolean,
    Integer,
    Float,
    Numeric,
    Uuid,
    Iso8601,
}

impl Check {
    /// Rule name reported back in validation errors.
    pub fn rule_name(self) -> &'static str {
        match self {
            Check::String => "isString",
            Check::Boolean => "isBoolean",
            Check::Integer => "isInt",
            Check::Float => "isFloat",
            Check::Numeric => "isNumeric",
            Check::Uuid => "isUUID",
            Check::Iso8601 => "isISO8601",
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Check::String => "a string",
            Check::Boolean => "a boolean",
            Check::Integer => "an integer",
            Check::Float => "a float",
            Check::Numeric => "numeric",
            Check::Uuid => "a valid UUID",
            Check::Iso8601 => "an ISO 8601 date",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldRuleConfig {
    pub field: String,
    pub check: Check,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    List,
    Read,
    Create,
    Update,
    Delete,
}

/// What a successful create answers with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Returning {
    #[default]
    Id,
    Record,
}

/// Body shape used for 404 and 500 answers of an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStyle {
    /// 404 and 500 bodies are bare JSON strings.
    #[default]
    JsonString,
    /// 404 is `text/plain`, 500 is `{ "message": ... }`.
    Message,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ListConfig {
    /// Query parameters that scope the listing (exact match on the same-named column).
    #[serde(default)]
    pub filters: Vec<FieldRuleConfig>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CreateConfig {
    #[serde(default)]
    pub rules: Vec<FieldRuleConfig>,
    pub writable: Vec<String>,
    /// Server-injected values; they override anything the caller sent.
    #[serde(default)]
    pub defaults: Map<String, Value>,
    #[serde(default)]
    pub returning: Returning,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdateConfig {
    #[serde(default)]
    pub rules: Vec<FieldRuleConfig>,
    pub writable: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    pub id: String,
    pub table: String,
    pub path_segment: String,
    pub not_found_message: String,
    #[serde(default = "default_true")]
    pub mounted: bool,
    #[serde(default)]
    pub error_style: ErrorStyle,
    /// Whether `addedById` is NOT NULL for this entity.
    #[serde(default)]
    pub added_by_required: bool,
    pub columns: Vec<ColumnConfig>,
    #[serde(default)]
    pub list: ListConfig,
    pub create: CreateConfig,
    pub update: UpdateConfig,
    /// Operations whose `:id` path parameter must be a UUID (400 otherwise).
    #[serde(default)]
    pub check_id: Vec<Operation>,
    /// Fields returned by read, list and update; every column when absent.
    #[serde(default)]
    pub projection: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

/// Whole catalog: enum types plus entities in dependency order (referenced entities first).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FullConfig {
    #[serde(default)]
    pub enums: Vec<EnumConfig>,
    pub entities: Vec<EntityConfig>,
}
