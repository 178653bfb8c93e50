//! Generic CRUD over any store, driven by the resolved entity.

use crate::clock::{format_timestamp, parse_timestamp, utc_now};
use crate::config::{ColumnInfo, ColumnKind, ResolvedEntity, Returning};
use crate::error::AppError;
use crate::store::{Row, Store};
use serde_json::{Map, Value};
use uuid::Uuid;

pub struct CrudService;

impl CrudService {
    /// All rows matching the filters (exact match), in store order.
    pub async fn list(
        store: &dyn Store,
        entity: &ResolvedEntity,
        filters: &[(String, Value)],
    ) -> Result<Vec<Row>, AppError> {
        tracing::debug!(entity = %entity.id, filters = filters.len(), "list");
        let rows = store.find_all(entity, filters).await?;
        Ok(rows.into_iter().map(|r| entity.project(r)).collect())
    }

    /// Fetch one row by id. Absence is not an error.
    pub async fn read(
        store: &dyn Store,
        entity: &ResolvedEntity,
        id: &str,
    ) -> Result<Option<Row>, AppError> {
        tracing::debug!(entity = %entity.id, id, "read");
        Ok(store.find_by_id(entity, id).await?.map(|r| entity.project(r)))
    }

    /// Insert one row built from the create-writable fields plus server-assigned values.
    /// Answers `{ "id" }` or the stored record, per entity.
    pub async fn create(
        store: &dyn Store,
        entity: &ResolvedEntity,
        body: &Map<String, Value>,
    ) -> Result<Value, AppError> {
        let mut row = prepare(entity, body, &entity.create_writable);
        for (field, value) in &entity.create_defaults {
            row.insert(field.clone(), value.clone());
        }
        let id = Uuid::new_v4().to_string();
        row.insert("id".into(), Value::String(id.clone()));
        row.insert("addedOn".into(), Value::String(format_timestamp(&utc_now())));
        row.insert("changedOn".into(), Value::Null);
        row.insert("changedById".into(), Value::Null);

        tracing::debug!(entity = %entity.id, id = %id, "create");
        let created = store.insert(entity, row).await?;
        Ok(match entity.returning {
            Returning::Id => {
                let id = created.get("id").cloned().unwrap_or(Value::String(id));
                serde_json::json!({ "id": id })
            }
            Returning::Record => Value::Object(entity.project(created)),
        })
    }

    /// Overwrite the update-writable fields present in `body` and stamp `changedOn`.
    pub async fn update(
        store: &dyn Store,
        entity: &ResolvedEntity,
        id: &str,
        body: &Map<String, Value>,
    ) -> Result<Row, AppError> {
        let mut changes = prepare(entity, body, &entity.update_writable);
        changes.insert("changedOn".into(), Value::String(format_timestamp(&utc_now())));
        tracing::debug!(entity = %entity.id, id, fields = changes.len(), "update");
        let row = store.update(entity, id, changes).await?;
        Ok(entity.project(row))
    }

    pub async fn delete(store: &dyn Store, entity: &ResolvedEntity, id: &str) -> Result<(), AppError> {
        tracing::debug!(entity = %entity.id, id, "delete");
        Ok(store.delete(entity, id).await?)
    }
}

/// Keep only `fields` from the body, each normalized for its column.
fn prepare(entity: &ResolvedEntity, body: &Map<String, Value>, fields: &[String]) -> Row {
    fields
        .iter()
        .filter_map(|f| {
            let value = body.get(f)?.clone();
            Some((f.clone(), normalize(entity.column(f), value)))
        })
        .collect()
}

/// Numeric and boolean strings become JSON numbers and booleans; dates become canonical UTC
/// timestamps. Whole floats bound for integer columns (`3.0`, `"2.0"`) become integers.
/// Anything that does not convert is passed on for the store to reject.
fn normalize(col: Option<&ColumnInfo>, value: Value) -> Value {
    let Some(col) = col else { return value };
    let s = match value {
        Value::String(s) => s,
        Value::Number(n) if col.kind == ColumnKind::Integer => {
            if n.is_i64() || n.is_u64() {
                return Value::Number(n);
            }
            return n.as_f64().and_then(whole_number).unwrap_or(Value::Number(n));
        }
        other => return other,
    };
    let converted = match col.kind {
        ColumnKind::Integer => s
            .trim()
            .parse::<i64>()
            .ok()
            .map(Value::from)
            .or_else(|| s.trim().parse::<f64>().ok().and_then(whole_number)),
        ColumnKind::Double => number_from_str(&s),
        ColumnKind::Boolean => match s.as_str() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        ColumnKind::Timestamp => parse_timestamp(&s).map(|ts| Value::String(format_timestamp(&ts))),
        _ => None,
    };
    converted.unwrap_or(Value::String(s))
}

fn whole_number(f: f64) -> Option<Value> {
    let in_range = f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64;
    in_range.then(|| Value::from(f as i64))
}

fn number_from_str(s: &str) -> Option<Value> {
    s.trim()
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{builtin_catalog, resolve, ResolvedModel};
    use crate::store::{MemoryStore, StoreError};
    use serde_json::json;

    const USER: &str = "0d6b3c55-4a3a-4c1e-8a57-3c1f2f1c0001";

    fn model() -> ResolvedModel {
        resolve(&builtin_catalog().unwrap(), true).unwrap()
    }

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn create_injects_defaults_and_audit_fields() {
        let model = model();
        let store = MemoryStore::new(&model);
        let category = model.entity_by_path("categories").unwrap();

        let created = CrudService::create(
            &store,
            category,
            &body(json!({"categoryName": "Tools", "isActive": false, "addedById": USER, "colour": "red"})),
        )
        .await
        .unwrap();
        let keys: Vec<&String> = created.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["id"]);

        let id = created["id"].as_str().unwrap();
        let row = CrudService::read(&store, category, id).await.unwrap().unwrap();
        assert_eq!(row["isActive"], json!(true));
        assert_eq!(row["addedById"], json!(USER));
        assert_eq!(row["changedOn"], Value::Null);
        assert!(row["addedOn"].as_str().unwrap().ends_with('Z'));
        assert!(row.get("colour").is_none());
    }

    #[tokio::test]
    async fn organisation_counters_start_at_zero_and_numbers_are_normalized() {
        let model = model();
        let store = MemoryStore::new(&model);
        let org = model.entity_by_path("organisations").unwrap();
        let created = CrudService::create(
            &store,
            org,
            &body(json!({"name": "Acme", "maxNumberOfEdits": "10", "numberOfEdits": 99})),
        )
        .await
        .unwrap();
        let row = CrudService::read(&store, org, created["id"].as_str().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row["numberOfEdits"], json!(0));
        assert_eq!(row["reportsGenerated"], json!(0));
        assert_eq!(row["maxNumberOfEdits"], json!(10));
        assert_eq!(row["maxNumberOfReportsToGenerate"], Value::Null);
    }

    #[tokio::test]
    async fn record_returning_entities_answer_with_the_row() {
        let model = model();
        let store = MemoryStore::new(&model);
        let header = model.entity("stock_transfer_report_header").unwrap();
        let created = CrudService::create(
            &store,
            header,
            &body(json!({"reportName": "March", "reportDate": "2024-03-01", "addedById": USER})),
        )
        .await
        .unwrap();
        assert_eq!(created["reportName"], json!("March"));
        assert_eq!(created["reportDate"], json!("2024-03-01T00:00:00.000000Z"));
        assert_eq!(created["changedById"], Value::Null);
    }

    #[tokio::test]
    async fn update_stamps_changed_on_and_keeps_write_once_fields() {
        let model = model();
        let store = MemoryStore::new(&model);
        let category = model.entity_by_path("categories").unwrap();
        let created = CrudService::create(
            &store,
            category,
            &body(json!({"categoryName": "Bolts", "isActive": true, "addedById": USER})),
        )
        .await
        .unwrap();
        let id = created["id"].as_str().unwrap();
        let before = CrudService::read(&store, category, id).await.unwrap().unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let after = CrudService::update(
            &store,
            category,
            id,
            &body(json!({"categoryName": "Nuts", "isActive": "false", "addedById": "0d6b3c55-4a3a-4c1e-8a57-3c1f2f1c0002"})),
        )
        .await
        .unwrap();

        assert_eq!(after["categoryName"], json!("Nuts"));
        assert_eq!(after["isActive"], json!(false));
        assert_eq!(after["addedOn"], before["addedOn"]);
        assert_eq!(after["addedById"], json!(USER));
        let added = parse_timestamp(after["addedOn"].as_str().unwrap()).unwrap();
        let changed = parse_timestamp(after["changedOn"].as_str().unwrap()).unwrap();
        assert!(changed > added);
    }

    #[tokio::test]
    async fn update_and_delete_of_missing_rows_fail() {
        let model = model();
        let store = MemoryStore::new(&model);
        let supplier = model.entity_by_path("suppliers").unwrap();
        let err = CrudService::update(&store, supplier, USER, &Map::new()).await.unwrap_err();
        assert!(matches!(err, AppError::Store(StoreError::RecordNotFound { .. })));
        let err = CrudService::delete(&store, supplier, USER).await.unwrap_err();
        assert_eq!(err.to_string(), "Record to delete does not exist.");
    }

    #[tokio::test]
    async fn projected_entities_hide_audit_fields() {
        let model = model();
        let store = MemoryStore::new(&model);
        let product = model.entity_by_path("products").unwrap();
        let created = CrudService::create(&store, product, &body(json!({"name": "Bolt", "addedById": USER})))
            .await
            .unwrap();
        let id = created["id"].as_str().unwrap();

        let row = CrudService::read(&store, product, id).await.unwrap().unwrap();
        let keys: Vec<&String> = row.keys().collect();
        assert_eq!(keys, vec!["id", "name", "isActive"]);

        let updated = CrudService::update(&store, product, id, &body(json!({"name": "Nut"})))
            .await
            .unwrap();
        assert!(updated.get("changedOn").is_none());
        assert_eq!(updated["name"], json!("Nut"));

        let rows = CrudService::list(&store, product, &[]).await.unwrap();
        assert_eq!(rows[0].len(), 3);
    }

    #[test]
    fn whole_floats_become_integers() {
        let model = model();
        let iiw = model.entity_by_path("items-in-warehouse").unwrap();
        let org = model.entity_by_path("organisations").unwrap();
        assert_eq!(normalize(iiw.column("quantity"), json!(3.0)), json!(3));
        assert_eq!(normalize(org.column("numberOfEdits"), json!("2.0")), json!(2));
        assert_eq!(normalize(iiw.column("quantity"), json!(2.5)), json!(2.5));
        assert_eq!(normalize(iiw.column("priceAtCost"), json!(3.0)), json!(3.0));
    }

    #[test]
    fn normalize_leaves_unconvertible_values() {
        let model = model();
        let iiw = model.entity_by_path("items-in-warehouse").unwrap();
        assert_eq!(normalize(iiw.column("quantity"), json!("5")), json!(5));
        assert_eq!(normalize(iiw.column("priceAtCost"), json!("2.50")), json!(2.5));
        assert_eq!(normalize(iiw.column("quantity"), json!("five")), json!("five"));
        assert_eq!(normalize(iiw.column("location"), json!("12")), json!("12"));
        assert_eq!(normalize(None, json!("x")), json!("x"));
    }
}
