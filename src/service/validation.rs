//! Request validation from catalog field rules.

use crate::clock::parse_timestamp;
use crate::config::{Check, FieldRule};
use crate::error::FieldError;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

pub struct RequestValidator;

impl RequestValidator {
    /// Check every rule against `values`, collecting all failures in rule order.
    /// Optional rules skip absent fields only; an explicit `null` is still checked.
    pub fn validate(rules: &[FieldRule], values: &Map<String, Value>) -> Vec<FieldError> {
        rules
            .iter()
            .filter_map(|rule| {
                let value = values.get(&rule.field);
                match value {
                    None if rule.optional => None,
                    Some(v) if check_value(rule.check, v) => None,
                    _ => Some(FieldError::new(
                        rule.field.as_str(),
                        rule.location.as_str(),
                        rule.check.rule_name(),
                        format!("{} must be {}", rule.field, rule.check.describe()),
                        value.cloned(),
                    )),
                }
            })
            .collect()
    }
}

fn int_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-+]?(?:0|[1-9][0-9]*)$").ok()).as_ref()
}

fn float_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-+]?[0-9]*(?:\.[0-9]*)?(?:[eE][-+]?[0-9]+)?$").ok())
        .as_ref()
}

fn numeric_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-+]?(?:[0-9]*\.)?[0-9]+$").ok()).as_ref()
}

fn check_value(check: Check, v: &Value) -> bool {
    match check {
        Check::String => v.is_string(),
        Check::Boolean => match v {
            Value::Bool(_) => true,
            Value::String(s) => matches!(s.as_str(), "true" | "false" | "1" | "0"),
            _ => false,
        },
        Check::Integer => match v {
            Value::Number(n) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            Value::String(s) => int_re().is_some_and(|re| re.is_match(s)),
            _ => false,
        },
        Check::Float => match v {
            Value::Number(_) => true,
            Value::String(s) => {
                !matches!(s.as_str(), "" | "." | "+" | "-")
                    && float_re().is_some_and(|re| re.is_match(s))
                    && has_digit(s)
            }
            _ => false,
        },
        Check::Numeric => match v {
            Value::Number(_) => true,
            Value::String(s) => numeric_re().is_some_and(|re| re.is_match(s)),
            _ => false,
        },
        Check::Uuid => v
            .as_str()
            .is_some_and(|s| s.len() == 36 && uuid::Uuid::try_parse(s).is_ok()),
        Check::Iso8601 => v.as_str().and_then(parse_timestamp).is_some(),
    }
}

fn has_digit(s: &str) -> bool {
    s.chars().take_while(|c| *c != 'e' && *c != 'E').any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Location;
    use serde_json::json;

    fn rule(field: &str, check: Check, optional: bool) -> FieldRule {
        FieldRule {
            field: field.into(),
            check,
            optional,
            location: Location::Body,
        }
    }

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn collects_every_failure_in_order() {
        let rules = vec![
            rule("categoryName", Check::String, false),
            rule("isActive", Check::Boolean, false),
            rule("addedById", Check::Uuid, false),
        ];
        let errors = RequestValidator::validate(&rules, &body(json!({"isActive": "maybe"})));
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["categoryName", "isActive", "addedById"]);
        assert_eq!(errors[0].value, None);
        assert_eq!(errors[1].value, Some(json!("maybe")));
        assert_eq!(errors[1].rule, "isBoolean");
        assert_eq!(errors[2].location, "body");
    }

    #[test]
    fn optional_skips_absent_but_not_null() {
        let rules = vec![rule("sku", Check::String, true)];
        assert!(RequestValidator::validate(&rules, &body(json!({}))).is_empty());
        assert_eq!(RequestValidator::validate(&rules, &body(json!({"sku": null}))).len(), 1);
    }

    #[test]
    fn integer_rule() {
        assert!(check_value(Check::Integer, &json!(12)));
        assert!(check_value(Check::Integer, &json!("-7")));
        assert!(check_value(Check::Integer, &json!(3.0)));
        assert!(!check_value(Check::Integer, &json!("007")));
        assert!(!check_value(Check::Integer, &json!(1.5)));
        assert!(!check_value(Check::Integer, &json!("1.5")));
    }

    #[test]
    fn float_and_numeric_rules() {
        assert!(check_value(Check::Float, &json!("12.50")));
        assert!(check_value(Check::Float, &json!(".5")));
        assert!(check_value(Check::Float, &json!("1e3")));
        assert!(!check_value(Check::Float, &json!(".")));
        assert!(!check_value(Check::Float, &json!("abc")));
        assert!(check_value(Check::Numeric, &json!("0.25")));
        assert!(check_value(Check::Numeric, &json!(10)));
        assert!(!check_value(Check::Numeric, &json!("1e3")));
        assert!(!check_value(Check::Numeric, &json!(true)));
    }

    #[test]
    fn uuid_and_date_rules() {
        assert!(check_value(Check::Uuid, &json!("6f1c1d2e-0b5c-4d8e-9f00-000000000001")));
        assert!(!check_value(Check::Uuid, &json!("6f1c1d2e0b5c4d8e9f00000000000001")));
        assert!(!check_value(Check::Uuid, &json!(42)));
        assert!(check_value(Check::Iso8601, &json!("2024-03-01")));
        assert!(check_value(Check::Iso8601, &json!("2024-03-01T10:00:00Z")));
        assert!(!check_value(Check::Iso8601, &json!("March 1st")));
    }
}
