//! Apply the resolved model to the database: schema, enum types, then tables with their keys.
//! Tables are created in catalog order, which the validator guarantees puts referenced tables first.

use crate::config::ResolvedModel;
use crate::sql::{qualified_table, quoted};
use crate::store::StoreError;
use sqlx::PgPool;

/// Idempotent DDL for `model` inside `schema`, in execution order.
pub fn migration_statements(model: &ResolvedModel, schema: &str) -> Vec<String> {
    let mut out = vec![format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema))];

    for e in &model.enums {
        let values: Vec<String> = e
            .values
            .iter()
            .map(|v| format!("'{}'", v.replace('\'', "''")))
            .collect();
        // CREATE TYPE has no IF NOT EXISTS.
        out.push(format!(
            "DO $$ BEGIN CREATE TYPE {} AS ENUM ({}); EXCEPTION WHEN duplicate_object THEN NULL; END $$",
            qualified_table(schema, &e.name),
            values.join(", ")
        ));
    }

    for entity in &model.entities {
        let mut defs: Vec<String> = Vec::new();
        for c in &entity.columns {
            let mut def = format!("{} {}", quoted(&c.column), c.kind.pg_type(schema));
            if !c.nullable {
                def.push_str(" NOT NULL");
            }
            defs.push(def);
        }
        let pk: Vec<String> = entity
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| quoted(&c.column))
            .collect();
        defs.push(format!("PRIMARY KEY ({})", pk.join(", ")));
        for c in &entity.columns {
            let Some(fk) = &c.references else { continue };
            defs.push(format!(
                "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} (\"id\") ON UPDATE CASCADE ON DELETE RESTRICT",
                quoted(&format!("{}_{}_fkey", entity.table_name, c.column)),
                quoted(&c.column),
                qualified_table(schema, &fk.table)
            ));
        }
        out.push(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
            qualified_table(schema, &entity.table_name),
            defs.join(",\n  ")
        ));
    }

    out
}

/// Create everything the model needs. Safe to run on every start.
pub async fn apply_migrations(pool: &PgPool, schema: &str, model: &ResolvedModel) -> Result<(), StoreError> {
    for sql in migration_statements(model, schema) {
        tracing::debug!(sql = %sql, "migration");
        sqlx::query(&sql).execute(pool).await?;
    }
    tracing::info!(schema, tables = model.entities.len(), "migrations applied");
    Ok(())
}
