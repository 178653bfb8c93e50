//! Load the entity catalog (embedded or from a file) and resolve it into the runtime model.

use crate::case::to_snake_case;
use crate::config::resolved::{
    ColumnInfo, ColumnKind, FieldRule, ForeignKey, Location, ResolvedEntity, ResolvedModel,
};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("catalog.json");

/// API names of the audit columns every entity carries, in projection order.
pub const AUDIT_FIELDS: [&str; 5] = ["id", "addedOn", "addedById", "changedOn", "changedById"];

/// The inventory catalog compiled into the binary.
pub fn builtin_catalog() -> Result<FullConfig, ConfigError> {
    serde_json::from_str(BUILTIN_CATALOG).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Read a catalog from a JSON file with the same layout as the built-in one.
pub async fn load_from_path(path: &Path) -> Result<FullConfig, ConfigError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}

/// Build resolved model from catalog (validates first). Unmounted entities are routable only when
/// `mount_unwired` is set; their tables exist either way.
pub fn resolve(config: &FullConfig, mount_unwired: bool) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;

    let table_by_entity: HashMap<&str, &str> = config
        .entities
        .iter()
        .map(|e| (e.id.as_str(), e.table.as_str()))
        .collect();

    let mut entities = Vec::with_capacity(config.entities.len());
    let mut entity_by_path = HashMap::new();

    for ent in &config.entities {
        let mut columns = vec![ColumnInfo {
            name: "id".into(),
            column: "id".into(),
            kind: ColumnKind::Uuid,
            nullable: false,
            primary_key: true,
            references: None,
        }];
        for c in &ent.columns {
            let references = match &c.references {
                Some(target) => {
                    let table = table_by_entity.get(target.as_str()).ok_or_else(|| {
                        ConfigError::MissingReference {
                            kind: "entity",
                            id: target.clone(),
                        }
                    })?;
                    Some(ForeignKey {
                        entity_id: target.clone(),
                        table: (*table).to_string(),
                    })
                }
                None => None,
            };
            columns.push(ColumnInfo {
                name: c.name.clone(),
                column: to_snake_case(&c.name),
                kind: column_kind(&ent.id, c)?,
                nullable: c.nullable,
                primary_key: false,
                references,
            });
        }
        for (name, kind, nullable) in [
            ("addedOn", ColumnKind::Timestamp, false),
            ("addedById", ColumnKind::Uuid, !ent.added_by_required),
            ("changedOn", ColumnKind::Timestamp, true),
            ("changedById", ColumnKind::Uuid, true),
        ] {
            columns.push(ColumnInfo {
                name: name.to_string(),
                column: to_snake_case(name),
                kind,
                nullable,
                primary_key: false,
                references: None,
            });
        }

        let entity = ResolvedEntity {
            id: ent.id.clone(),
            table_name: ent.table.clone(),
            path_segment: ent.path_segment.clone(),
            mounted: ent.mounted,
            not_found_message: ent.not_found_message.clone(),
            error_style: ent.error_style,
            columns,
            list_filters: rules_at(&ent.list.filters, Location::Query),
            create_rules: rules_at(&ent.create.rules, Location::Body),
            create_writable: ent.create.writable.clone(),
            create_defaults: ent.create.defaults.clone(),
            returning: ent.create.returning,
            update_rules: rules_at(&ent.update.rules, Location::Body),
            update_writable: ent.update.writable.clone(),
            check_id: ent.check_id.clone(),
            projection: ent.projection.clone(),
        };
        if entity.mounted || mount_unwired {
            entity_by_path.insert(entity.path_segment.clone(), entity.clone());
        }
        entities.push(entity);
    }

    Ok(ResolvedModel {
        entities,
        entity_by_path,
        enums: config.enums.clone(),
    })
}

fn rules_at(rules: &[FieldRuleConfig], location: Location) -> Vec<FieldRule> {
    rules
        .iter()
        .map(|r| FieldRule {
            field: r.field.clone(),
            check: r.check,
            optional: r.optional,
            location,
        })
        .collect()
}

pub(crate) fn column_kind(entity_id: &str, col: &ColumnConfig) -> Result<ColumnKind, ConfigError> {
    match &col.type_ {
        ColumnTypeConfig::Enum { name } => Ok(ColumnKind::Enum(name.clone())),
        ColumnTypeConfig::Simple(s) => match s.to_lowercase().as_str() {
            "uuid" => Ok(ColumnKind::Uuid),
            "text" | "string" => Ok(ColumnKind::Text),
            "integer" | "int" | "int4" => Ok(ColumnKind::Integer),
            "double" | "float" | "float8" => Ok(ColumnKind::Double),
            "boolean" | "bool" => Ok(ColumnKind::Boolean),
            "timestamptz" | "timestamp" => Ok(ColumnKind::Timestamp),
            other => Err(ConfigError::UnknownType {
                entity: entity_id.to_string(),
                column: col.name.clone(),
                type_name: other.to_string(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_resolves_all_entities() {
        let config = builtin_catalog().unwrap();
        let model = resolve(&config, false).unwrap();
        assert_eq!(model.entities.len(), 12);
        assert_eq!(
            model.mounted_paths(),
            vec![
                "organisations",
                "users",
                "products",
                "suppliers",
                "categories",
                "sub-categories",
                "items",
                "items-in-warehouse",
            ]
        );
        assert!(model.entity_by_path("store-stock-cards").is_none());
        assert!(model.entity("store_stock_card").is_some());
    }

    #[test]
    fn mount_unwired_exposes_every_entity() {
        let config = builtin_catalog().unwrap();
        let model = resolve(&config, true).unwrap();
        assert_eq!(model.entity_by_path.len(), 12);
        assert!(model.entity_by_path("stock-transfer-report-headers").is_some());
    }

    #[test]
    fn audit_columns_are_appended() {
        let model = resolve(&builtin_catalog().unwrap(), false).unwrap();
        let item = model.entity_by_path("items").unwrap();
        assert_eq!(item.columns[0].name, "id");
        assert!(item.columns[0].primary_key);
        for field in AUDIT_FIELDS {
            assert!(item.column(field).is_some(), "missing {field}");
        }
        let added_on = item.column("addedOn").unwrap();
        assert_eq!(added_on.column, "added_on");
        assert!(!added_on.nullable);
        assert!(!item.column("addedById").unwrap().nullable);
        assert!(item.column("changedOn").unwrap().nullable);
        assert!(item.column("addedById").unwrap().references.is_none());
        assert!(item.column("changedById").unwrap().references.is_none());

        let org = model.entity_by_path("organisations").unwrap();
        assert!(org.column("addedById").unwrap().nullable);
    }

    #[test]
    fn projection_is_carried_only_where_declared() {
        let model = resolve(&builtin_catalog().unwrap(), false).unwrap();
        let org = model.entity_by_path("organisations").unwrap();
        let fields = org.projection.as_ref().unwrap();
        assert_eq!(fields[0], "id");
        assert!(!fields.iter().any(|f| f == "addedOn"));
        assert!(model.entity_by_path("items").unwrap().projection.is_none());
    }

    #[test]
    fn foreign_keys_carry_target_table() {
        let model = resolve(&builtin_catalog().unwrap(), false).unwrap();
        let card = model.entity("store_stock_card").unwrap();
        let fk = card.column("itemInStoreId").unwrap().references.as_ref().unwrap();
        assert_eq!(fk.entity_id, "item_in_store");
        assert_eq!(fk.table, "item_in_store");
        assert_eq!(card.column("itemInStoreId").unwrap().column, "item_in_store_id");
    }

    #[test]
    fn rules_keep_declaration_order_and_location() {
        let model = resolve(&builtin_catalog().unwrap(), false).unwrap();
        let users = model.entity_by_path("users").unwrap();
        let fields: Vec<&str> = users.create_rules.iter().map(|r| r.field.as_str()).collect();
        assert_eq!(fields, vec!["firstName", "lastName", "email", "userRole", "organisationId"]);
        assert_eq!(users.list_filters[0].location, Location::Query);
        assert!(users.checks_id(Operation::Delete));
        assert!(!users.checks_id(Operation::Read));
    }

    #[test]
    fn unknown_column_type_is_rejected() {
        let col = ColumnConfig {
            name: "weight".into(),
            type_: ColumnTypeConfig::Simple("decimal(10,2)".into()),
            nullable: false,
            references: None,
        };
        assert!(matches!(
            column_kind("item", &col),
            Err(ConfigError::UnknownType { .. })
        ));
    }
}
