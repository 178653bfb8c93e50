//! Catalog validation: referential integrity and API consistency.

use crate::config::loader::{column_kind, AUDIT_FIELDS};
use crate::config::{ColumnTypeConfig, FieldRuleConfig, FullConfig};
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    let enum_names: HashSet<&str> = config.enums.iter().map(|e| e.name.as_str()).collect();
    let mut entity_ids: HashSet<&str> = HashSet::new();
    let mut path_segments = HashSet::new();
    let mut tables = HashSet::new();

    for ent in &config.entities {
        if !entity_ids.insert(ent.id.as_str()) {
            return Err(ConfigError::DuplicateEntity(ent.id.clone()));
        }
        if !path_segments.insert(ent.path_segment.as_str()) {
            return Err(ConfigError::DuplicatePathSegment(ent.path_segment.clone()));
        }
        if !tables.insert(ent.table.as_str()) {
            return Err(ConfigError::Validation(format!("table '{}' declared twice", ent.table)));
        }

        let mut columns: HashSet<&str> = AUDIT_FIELDS.iter().copied().collect();
        for c in &ent.columns {
            if !columns.insert(c.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "{}: column '{}' declared twice or shadows an audit column",
                    ent.id, c.name
                )));
            }
            column_kind(&ent.id, c)?;
            if let ColumnTypeConfig::Enum { name } = &c.type_ {
                if !enum_names.contains(name.as_str()) {
                    return Err(ConfigError::MissingReference {
                        kind: "enum",
                        id: name.clone(),
                    });
                }
            }
            // Referenced entities must be declared earlier so tables can be created in order.
            if let Some(target) = &c.references {
                if !entity_ids.contains(target.as_str()) || target == &ent.id {
                    return Err(ConfigError::MissingReference {
                        kind: "entity",
                        id: target.clone(),
                    });
                }
            }
        }

        let known = |field: &str| -> Result<(), ConfigError> {
            if columns.contains(field) {
                Ok(())
            } else {
                Err(ConfigError::UnknownColumn {
                    entity: ent.id.clone(),
                    column: field.to_string(),
                })
            }
        };
        let rule_fields = |rules: &[FieldRuleConfig]| -> Result<(), ConfigError> {
            rules.iter().try_for_each(|r| known(r.field.as_str()))
        };

        rule_fields(&ent.list.filters)?;
        rule_fields(&ent.create.rules)?;
        rule_fields(&ent.update.rules)?;
        ent.create.writable.iter().try_for_each(|f| known(f.as_str()))?;
        ent.create.defaults.keys().try_for_each(|f| known(f.as_str()))?;
        ent.update.writable.iter().try_for_each(|f| known(f.as_str()))?;
        if let Some(fields) = &ent.projection {
            fields.iter().try_for_each(|f| known(f.as_str()))?;
            if !fields.iter().any(|f| f == "id") {
                return Err(ConfigError::Validation(format!("{}: projection must include 'id'", ent.id)));
            }
        }

        for immutable in ["id", "addedOn", "addedById", "changedOn"] {
            if ent.update.writable.iter().any(|f| f == immutable) {
                return Err(ConfigError::Validation(format!(
                    "{}: '{}' cannot be writable on update",
                    ent.id, immutable
                )));
            }
        }
        for managed in ["id", "addedOn", "changedOn", "changedById"] {
            if ent.create.writable.iter().any(|f| f == managed) {
                return Err(ConfigError::Validation(format!(
                    "{}: '{}' is assigned by the server on create",
                    ent.id, managed
                )));
            }
        }
    }

    Ok(())
}
