//! Process-local store. Used when no database is configured and by the test-suite.
//!
//! Values go through the same text coercion PostgreSQL applies to our `$n::type` parameters, and the
//! not-null, foreign-key (RESTRICT) and primary-key constraints of the generated schema are enforced,
//! so the HTTP layer sees the same failures it would against the real store.

use super::{Row, Store, StoreError};
use crate::clock::{format_timestamp, parse_timestamp};
use crate::config::{ColumnInfo, ColumnKind, Operation, ResolvedEntity, ResolvedModel};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

type Tables = HashMap<String, Vec<Row>>;

/// A foreign key: `table.field` points at `target.id`.
#[derive(Debug)]
struct Reference {
    table: String,
    column: String,
    field: String,
    target: String,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    references: Vec<Reference>,
    enums: HashMap<String, Vec<String>>,
}

impl MemoryStore {
    pub fn new(model: &ResolvedModel) -> Self {
        let references = model
            .entities
            .iter()
            .flat_map(|e| {
                e.columns.iter().filter_map(move |c| {
                    c.references.as_ref().map(|fk| Reference {
                        table: e.table_name.clone(),
                        column: c.column.clone(),
                        field: c.name.clone(),
                        target: fk.table.clone(),
                    })
                })
            })
            .collect();
        let enums = model
            .enums
            .iter()
            .map(|e| (e.name.clone(), e.values.clone()))
            .collect();
        MemoryStore {
            tables: RwLock::new(HashMap::new()),
            references,
            enums,
        }
    }

    /// Coerce a value into the column's type; `Null` is passed through for the caller to judge.
    fn coerce(&self, col: &ColumnInfo, value: Value) -> Result<Value, StoreError> {
        let text = match value {
            Value::Null => return Ok(Value::Null),
            Value::String(s) => s,
            other => other.to_string(),
        };
        let invalid = |type_name: &str| StoreError::InvalidValue {
            column: col.column.clone(),
            message: format!("invalid input syntax for type {}: \"{}\"", type_name, text),
        };
        let trimmed = text.trim();
        match &col.kind {
            ColumnKind::Text => Ok(Value::String(text.clone())),
            ColumnKind::Uuid => Uuid::try_parse(trimmed)
                .map(|u| Value::String(u.to_string()))
                .map_err(|_| invalid("uuid")),
            ColumnKind::Integer => trimmed
                .parse::<i32>()
                .map(Value::from)
                .map_err(|_| invalid("integer")),
            ColumnKind::Double => trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::from)
                .ok_or_else(|| invalid("double precision")),
            ColumnKind::Boolean => match trimmed.to_lowercase().as_str() {
                "t" | "true" | "y" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
                "f" | "false" | "n" | "no" | "off" | "0" => Ok(Value::Bool(false)),
                _ => Err(invalid("boolean")),
            },
            ColumnKind::Timestamp => parse_timestamp(trimmed)
                .map(|ts| Value::String(format_timestamp(&ts)))
                .ok_or_else(|| invalid("timestamp with time zone")),
            ColumnKind::Enum(name) => {
                let known = self
                    .enums
                    .get(name)
                    .is_some_and(|values| values.iter().any(|v| v == &text));
                if known {
                    Ok(Value::String(text.clone()))
                } else {
                    Err(StoreError::InvalidValue {
                        column: col.column.clone(),
                        message: format!("invalid input value for enum {}: \"{}\"", name, text),
                    })
                }
            }
        }
    }

    fn coerce_for_write(
        &self,
        entity: &ResolvedEntity,
        col: &ColumnInfo,
        value: Value,
    ) -> Result<Value, StoreError> {
        let value = self.coerce(col, value)?;
        if value.is_null() && !col.nullable {
            return Err(StoreError::Constraint(format!(
                "null value in column \"{}\" of relation \"{}\" violates not-null constraint",
                col.column, entity.table_name
            )));
        }
        Ok(value)
    }

    fn check_references(tables: &Tables, entity: &ResolvedEntity, row: &Row) -> Result<(), StoreError> {
        for col in &entity.columns {
            let (Some(fk), Some(value)) = (&col.references, row.get(&col.name)) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let exists = tables
                .get(&fk.table)
                .is_some_and(|rows| rows.iter().any(|r| r.get("id") == Some(value)));
            if !exists {
                return Err(StoreError::Constraint(format!(
                    "insert or update on table \"{}\" violates foreign key constraint \"{}_{}_fkey\"",
                    entity.table_name, entity.table_name, col.column
                )));
            }
        }
        Ok(())
    }

    fn read_tables(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write_tables(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }
}

fn parse_id(id: &str) -> Option<Value> {
    Uuid::try_parse(id).ok().map(|u| Value::String(u.to_string()))
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert(&self, entity: &ResolvedEntity, mut row: Row) -> Result<Row, StoreError> {
        let mut stored = Row::new();
        for col in &entity.columns {
            let value = row.remove(&col.name).unwrap_or(Value::Null);
            stored.insert(col.name.clone(), self.coerce_for_write(entity, col, value)?);
        }

        let mut tables = self.write_tables()?;
        Self::check_references(&tables, entity, &stored)?;
        let rows = tables.entry(entity.table_name.clone()).or_default();
        if rows.iter().any(|r| r.get("id") == stored.get("id")) {
            return Err(StoreError::Constraint(format!(
                "duplicate key value violates unique constraint \"{}_pkey\"",
                entity.table_name
            )));
        }
        rows.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, entity: &ResolvedEntity, id: &str) -> Result<Option<Row>, StoreError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        let tables = self.read_tables()?;
        Ok(tables
            .get(&entity.table_name)
            .and_then(|rows| rows.iter().find(|r| r.get("id") == Some(&id)))
            .cloned())
    }

    async fn find_all(
        &self,
        entity: &ResolvedEntity,
        filters: &[(String, Value)],
    ) -> Result<Vec<Row>, StoreError> {
        let mut wanted = Vec::with_capacity(filters.len());
        for (field, value) in filters {
            let Some(col) = entity.column(field) else {
                continue;
            };
            let value = self.coerce(col, value.clone())?;
            // `column = NULL` never matches.
            if value.is_null() {
                return Ok(Vec::new());
            }
            wanted.push((field.as_str(), value));
        }

        let tables = self.read_tables()?;
        Ok(tables
            .get(&entity.table_name)
            .map(|rows| {
                rows.iter()
                    .filter(|r| wanted.iter().all(|(f, v)| r.get(*f) == Some(v)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update(&self, entity: &ResolvedEntity, id: &str, changes: Row) -> Result<Row, StoreError> {
        let not_found = || StoreError::RecordNotFound {
            operation: Operation::Update,
        };
        let id = parse_id(id).ok_or_else(not_found)?;

        let mut coerced = Row::new();
        for (field, value) in changes {
            let Some(col) = entity.column(&field).filter(|c| !c.primary_key) else {
                continue;
            };
            coerced.insert(field, self.coerce_for_write(entity, col, value)?);
        }

        let mut tables = self.write_tables()?;
        Self::check_references(&tables, entity, &coerced)?;
        let row = tables
            .get_mut(&entity.table_name)
            .and_then(|rows| rows.iter_mut().find(|r| r.get("id") == Some(&id)))
            .ok_or_else(not_found)?;
        row.extend(coerced);
        Ok(row.clone())
    }

    async fn delete(&self, entity: &ResolvedEntity, id: &str) -> Result<(), StoreError> {
        let not_found = || StoreError::RecordNotFound {
            operation: Operation::Delete,
        };
        let id = parse_id(id).ok_or_else(not_found)?;

        let mut tables = self.write_tables()?;
        let position = tables
            .get(&entity.table_name)
            .and_then(|rows| rows.iter().position(|r| r.get("id") == Some(&id)))
            .ok_or_else(not_found)?;

        for reference in self.references.iter().filter(|r| r.target == entity.table_name) {
            let referenced = tables
                .get(&reference.table)
                .is_some_and(|rows| rows.iter().any(|r| r.get(&reference.field) == Some(&id)));
            if referenced {
                return Err(StoreError::Constraint(format!(
                    "update or delete on table \"{}\" violates foreign key constraint \"{}_{}_fkey\" on table \"{}\"",
                    entity.table_name, reference.table, reference.column, reference.table
                )));
            }
        }

        if let Some(rows) = tables.get_mut(&entity.table_name) {
            rows.remove(position);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.read_tables().map(|_| ())
    }
}
