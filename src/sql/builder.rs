//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from a resolved entity.
//! Identifiers come from the catalog only; every value is a `$n` parameter cast to its column type.

use crate::config::{ColumnInfo, ColumnKind, ResolvedEntity};
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from config).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Push a value and return its cast placeholder, e.g. `$2::uuid`.
    fn push_param(&mut self, v: Value, col: &ColumnInfo, schema: &str) -> String {
        self.params.push(v);
        format!("${}::{}", self.params.len(), col.kind.pg_type(schema))
    }
}

/// SELECT list: storage columns aliased back to API names; enum columns read as text.
fn select_column_list(entity: &ResolvedEntity) -> String {
    entity
        .columns
        .iter()
        .map(|c| {
            let q = quoted(&c.column);
            let expr = if matches!(c.kind, ColumnKind::Enum(_)) {
                format!("{}::text", q)
            } else {
                q
            };
            format!("{} AS {}", expr, quoted(&c.name))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn id_pk_name(entity: &ResolvedEntity) -> &str {
    entity
        .columns
        .iter()
        .find(|c| c.primary_key)
        .map(|c| c.column.as_str())
        .unwrap_or("id")
}

/// SELECT by primary key. Caller binds the id as `$1`.
pub fn select_by_id(entity: &ResolvedEntity, schema: &str, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, &entity.table_name);
    q.params.push(Value::String(id.to_string()));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = $1::uuid",
        select_column_list(entity),
        table,
        quoted(id_pk_name(entity))
    );
    q
}

/// SELECT with exact-match filters (API field names), oldest rows first.
/// Filters on fields the entity does not have are ignored.
pub fn select_list(entity: &ResolvedEntity, schema: &str, filters: &[(String, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, &entity.table_name);

    let mut where_parts = Vec::new();
    for (field, val) in filters {
        let Some(col) = entity.column(field) else { continue };
        let ph = q.push_param(val.clone(), col, schema);
        where_parts.push(format!("{} = {}", quoted(&col.column), ph));
    }

    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    let order_clause = match entity.column("addedOn") {
        Some(added_on) => format!(
            " ORDER BY {}, {}",
            quoted(&added_on.column),
            quoted(id_pk_name(entity))
        ),
        None => format!(" ORDER BY {}", quoted(id_pk_name(entity))),
    };
    q.sql = format!(
        "SELECT {} FROM {}{}{}",
        select_column_list(entity),
        table,
        where_clause,
        order_clause
    );
    q
}

/// INSERT of every entity column present in `row` (absent ones fall back to NULL).
pub fn insert(entity: &ResolvedEntity, schema: &str, row: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, &entity.table_name);
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &entity.columns {
        let Some(val) = row.get(&c.name) else { continue };
        placeholders.push(q.push_param(val.clone(), c, schema));
        cols.push(quoted(&c.column));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        table,
        cols.join(", "),
        placeholders.join(", "),
        select_column_list(entity)
    );
    q
}

/// UPDATE by id: SET only entity columns present in `changes` (never the primary key).
/// With nothing to set this degrades to a SELECT by id.
pub fn update(
    entity: &ResolvedEntity,
    schema: &str,
    id: &str,
    changes: &Map<String, Value>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, &entity.table_name);
    let mut sets = Vec::new();
    for c in entity.columns.iter().filter(|c| !c.primary_key) {
        let Some(val) = changes.get(&c.name) else { continue };
        let rhs = q.push_param(val.clone(), c, schema);
        sets.push(format!("{} = {}", quoted(&c.column), rhs));
    }
    if sets.is_empty() {
        return select_by_id(entity, schema, id);
    }
    q.params.push(Value::String(id.to_string()));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${}::uuid RETURNING {}",
        table,
        sets.join(", "),
        quoted(id_pk_name(entity)),
        q.params.len(),
        select_column_list(entity)
    );
    q
}

/// DELETE by id, returning the id so a miss can be told apart.
pub fn delete(entity: &ResolvedEntity, schema: &str, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, &entity.table_name);
    let pk = quoted(id_pk_name(entity));
    q.params.push(Value::String(id.to_string()));
    q.sql = format!("DELETE FROM {} WHERE {} = $1::uuid RETURNING {}", table, pk, pk);
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{builtin_catalog, resolve, ResolvedModel};
    use serde_json::json;

    fn model() -> ResolvedModel {
        resolve(&builtin_catalog().unwrap(), true).unwrap()
    }

    #[test]
    fn select_aliases_storage_columns() {
        let model = model();
        let users = model.entity_by_path("users").unwrap();
        let q = select_by_id(users, "public", "abc");
        assert!(q.sql.starts_with("SELECT \"id\" AS \"id\", \"first_name\" AS \"firstName\""));
        assert!(q.sql.contains("\"user_role\"::text AS \"userRole\""));
        assert!(q.sql.contains("FROM \"public\".\"user\" WHERE \"id\" = $1::uuid"));
        assert_eq!(q.params, vec![json!("abc")]);
    }

    #[test]
    fn list_filters_cast_and_skip_unknown_fields() {
        let model = model();
        let users = model.entity_by_path("users").unwrap();
        let q = select_list(
            users,
            "inv",
            &[
                ("organisationId".into(), json!("o-1")),
                ("colour".into(), json!("red")),
            ],
        );
        assert!(q.sql.ends_with(
            "FROM \"inv\".\"user\" WHERE \"organisation_id\" = $1::uuid ORDER BY \"added_on\", \"id\""
        ));
        assert_eq!(q.params, vec![json!("o-1")]);
    }

    #[test]
    fn insert_binds_present_columns_in_catalog_order() {
        let model = model();
        let users = model.entity_by_path("users").unwrap();
        let row = json!({"userRole": "ADMIN", "id": "u-1", "firstName": "Ada"});
        let q = insert(users, "public", row.as_object().unwrap());
        assert!(q.sql.starts_with(
            "INSERT INTO \"public\".\"user\" (\"id\", \"first_name\", \"user_role\") VALUES ($1::uuid, $2::text, $3::\"public\".\"user_role\") RETURNING "
        ));
        assert_eq!(q.params, vec![json!("u-1"), json!("Ada"), json!("ADMIN")]);
    }

    #[test]
    fn update_sets_fields_then_binds_id_last() {
        let model = model();
        let items = model.entity_by_path("items-in-warehouse").unwrap();
        let changes = json!({"quantity": 4, "changedOn": "2024-01-01T00:00:00.000000Z", "id": "x"});
        let q = update(items, "public", "i-1", changes.as_object().unwrap());
        assert!(q.sql.starts_with(
            "UPDATE \"public\".\"item_in_warehouse\" SET \"quantity\" = $1::int4, \"changed_on\" = $2::timestamptz WHERE \"id\" = $3::uuid RETURNING "
        ));
        assert_eq!(q.params.last(), Some(&json!("i-1")));
    }

    #[test]
    fn empty_update_reads_back() {
        let model = model();
        let products = model.entity_by_path("products").unwrap();
        let q = update(products, "public", "p-1", &Map::new());
        assert!(q.sql.starts_with("SELECT "));
    }

    #[test]
    fn delete_returns_id() {
        let model = model();
        let suppliers = model.entity_by_path("suppliers").unwrap();
        let q = delete(suppliers, "public", "s-1");
        assert_eq!(
            q.sql,
            "DELETE FROM \"public\".\"supplier\" WHERE \"id\" = $1::uuid RETURNING \"id\""
        );
    }
}
