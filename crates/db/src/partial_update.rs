//! Partial updates built from a sparse set of caller-supplied fields.
//!
//! A JSON object is filtered to a model's whitelist, deserialized into the
//! model's typed `Update*` struct, and folded into ordered `(column, value)`
//! assignments. Only assignments ever reach SQL text as column names, and
//! those are `'static` strings owned by the model; every value is bound.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite};
use strum_macros::{Display, EnumString};
use thiserror::Error;

use crate::id_allocator::EntityTable;

/// What to do with field names outside a model's whitelist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum UnknownFieldPolicy {
    #[default]
    Ignore,
    Reject,
}

#[derive(Debug, Error, PartialEq)]
pub enum UpdateError {
    #[error("no fields supplied")]
    NoFields,
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("invalid field value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Bool(bool),
    Date(NaiveDate),
}

pub type Assignment = (&'static str, FieldValue);

/// A typed set of optional column changes for one table.
pub trait PartialUpdate: DeserializeOwned {
    const TABLE: EntityTable;
    /// Field names accepted from callers.
    const FIELDS: &'static [&'static str];

    /// Present fields only, in a stable column order.
    fn into_assignments(self) -> Vec<Assignment>;
}

/// Turn a caller's field map into typed changes for `U`.
pub fn parse_fields<U: PartialUpdate>(
    fields: &Map<String, Value>,
    policy: UnknownFieldPolicy,
) -> Result<U, UpdateError> {
    let mut accepted = Map::new();
    for (name, value) in fields {
        if U::FIELDS.contains(&name.as_str()) {
            accepted.insert(name.clone(), value.clone());
        } else if policy == UnknownFieldPolicy::Reject {
            return Err(UpdateError::UnknownField(name.clone()));
        }
    }
    serde_json::from_value(Value::Object(accepted))
        .map_err(|e| UpdateError::InvalidValue(e.to_string()))
}

/// `UPDATE <table> SET c1 = ?, c2 = ? WHERE id = ? RETURNING *`
pub fn build_update(
    table: EntityTable,
    id: i64,
    assignments: Vec<Assignment>,
) -> Result<QueryBuilder<'static, Sqlite>, UpdateError> {
    if assignments.is_empty() {
        return Err(UpdateError::NoFields);
    }

    let mut qb: QueryBuilder<'static, Sqlite> = QueryBuilder::new("UPDATE ");
    qb.push(table.table_name());
    qb.push(" SET ");
    {
        let mut set = qb.separated(", ");
        for (column, value) in assignments {
            set.push(column);
            set.push_unseparated(" = ");
            match value {
                FieldValue::Text(v) => set.push_bind_unseparated(v),
                FieldValue::Integer(v) => set.push_bind_unseparated(v),
                FieldValue::Bool(v) => set.push_bind_unseparated(v),
                FieldValue::Date(v) => set.push_bind_unseparated(v),
            };
        }
    }
    qb.push(" WHERE id = ");
    qb.push_bind(id);
    qb.push(" RETURNING *");
    Ok(qb)
}

/// Appends `(column, value)` when the field was supplied.
pub(crate) fn push_present<T>(
    assignments: &mut Vec<Assignment>,
    column: &'static str,
    value: Option<T>,
    wrap: fn(T) -> FieldValue,
) {
    if let Some(value) = value {
        assignments.push((column, wrap(value)));
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct UpdateWidget {
        label: Option<String>,
        weight: Option<i64>,
        active: Option<bool>,
    }

    impl PartialUpdate for UpdateWidget {
        const TABLE: EntityTable = EntityTable::Tags;
        const FIELDS: &'static [&'static str] = &["label", "weight", "active"];

        fn into_assignments(self) -> Vec<Assignment> {
            let mut out = Vec::new();
            push_present(&mut out, "label", self.label, FieldValue::Text);
            push_present(&mut out, "weight", self.weight, FieldValue::Integer);
            push_present(&mut out, "active", self.active, FieldValue::Bool);
            out
        }
    }

    fn assignments(
        fields: &Map<String, Value>,
        policy: UnknownFieldPolicy,
    ) -> Result<Vec<Assignment>, UpdateError> {
        parse_fields::<UpdateWidget>(fields, policy).map(UpdateWidget::into_assignments)
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_only_supplied_fields_are_assigned() {
        let fields = object(json!({ "weight": 3 }));
        let assignments = assignments(&fields, UnknownFieldPolicy::Ignore).unwrap();
        assert_eq!(assignments, vec![("weight", FieldValue::Integer(3))]);
    }

    #[test]
    fn test_empty_map_is_rejected() {
        let empty = assignments(&Map::new(), UnknownFieldPolicy::Ignore).unwrap();
        assert!(empty.is_empty());
        assert_eq!(
            build_update(EntityTable::Tags, 1, empty).err(),
            Some(UpdateError::NoFields)
        );
    }

    #[test]
    fn test_unknown_fields_ignored_by_default() {
        let fields = object(json!({ "colour": "red" }));
        let dropped = assignments(&fields, UnknownFieldPolicy::default()).unwrap();
        assert_eq!(
            build_update(EntityTable::Tags, 1, dropped).err(),
            Some(UpdateError::NoFields)
        );

        let fields = object(json!({ "colour": "red", "label": "x" }));
        let assignments = assignments(&fields, UnknownFieldPolicy::Ignore).unwrap();
        assert_eq!(assignments, vec![("label", FieldValue::Text("x".to_string()))]);
    }

    #[test]
    fn test_unknown_fields_rejected_when_configured() {
        let fields = object(json!({ "label": "x", "colour": "red" }));
        let result = assignments(&fields, UnknownFieldPolicy::Reject);
        assert_eq!(result, Err(UpdateError::UnknownField("colour".to_string())));
    }

    #[test]
    fn test_type_mismatch_is_invalid_value() {
        let fields = object(json!({ "weight": "heavy" }));
        let result = assignments(&fields, UnknownFieldPolicy::Ignore);
        assert!(matches!(result, Err(UpdateError::InvalidValue(_))));
    }

    #[test]
    fn test_explicit_null_counts_as_absent() {
        let fields = object(json!({ "label": null, "active": false }));
        let assignments = assignments(&fields, UnknownFieldPolicy::Ignore).unwrap();
        assert_eq!(assignments, vec![("active", FieldValue::Bool(false))]);
    }

    #[test]
    fn test_statement_binds_every_value() {
        let qb = build_update(
            EntityTable::Tags,
            7,
            vec![
                ("label", FieldValue::Text("x'; DROP TABLE tags; --".to_string())),
                ("weight", FieldValue::Integer(2)),
            ],
        )
        .unwrap();
        assert_eq!(
            qb.sql(),
            "UPDATE tags SET label = ?, weight = ? WHERE id = ? RETURNING *"
        );
    }

    #[test]
    fn test_policy_parses_case_insensitively() {
        assert_eq!(
            "Reject".parse::<UnknownFieldPolicy>().unwrap(),
            UnknownFieldPolicy::Reject
        );
        assert_eq!(UnknownFieldPolicy::Ignore.to_string(), "ignore");
    }
}
