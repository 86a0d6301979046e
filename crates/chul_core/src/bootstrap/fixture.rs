//! Fixture file parsing and natural-key upserts.
//!
//! A fixture file looks like:
//!
//! ```json
//! {
//!   "model": "common.Constituency",
//!   "unique_fields": ["code"],
//!   "records": [
//!     {"name": "KIBRA", "code": 288, "county": {"code": 47}}
//!   ]
//! }
//! ```
//!
//! Nested objects resolve foreign keys by looking up the referenced model
//! with the object's fields. Natural keys match with `IS`, so a `null` key
//! field finds the row loaded with `null` on an earlier run.

use super::models::{find_model, ReferenceModel};
use super::BootstrapError;
use crate::model::audit::now_epoch_ms;
use crate::repo::catalog_repo::track_catalog_write;
use crate::repo::revision::RevisionAction;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub(crate) struct Fixture {
    pub model: String,
    #[serde(default)]
    pub unique_fields: Vec<String>,
    #[serde(default)]
    pub records: Vec<JsonValue>,
}

/// Insert/update counters for one fixture file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FixtureOutcome {
    pub inserted: usize,
    pub updated: usize,
}

pub(crate) fn read_fixture(path: &Path) -> Result<Fixture, BootstrapError> {
    let contents = std::fs::read_to_string(path).map_err(|source| BootstrapError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| BootstrapError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Upserts every record of a fixture on the caller's transaction.
pub(crate) fn apply_fixture(
    conn: &Connection,
    path: &Path,
    fixture: &Fixture,
) -> Result<FixtureOutcome, BootstrapError> {
    let model = find_model(&fixture.model).ok_or_else(|| BootstrapError::UnknownModel {
        path: path.to_path_buf(),
        model: fixture.model.clone(),
    })?;
    if fixture.unique_fields.is_empty() {
        return Err(BootstrapError::InvalidFixture {
            path: path.to_path_buf(),
            message: "`unique_fields` must name at least one field".to_string(),
        });
    }

    let mut outcome = FixtureOutcome::default();
    for (index, record) in fixture.records.iter().enumerate() {
        let object = record
            .as_object()
            .ok_or_else(|| BootstrapError::InvalidFixture {
                path: path.to_path_buf(),
                message: format!("record {index} is not an object"),
            })?;

        let columns = record_columns(conn, path, model, object)?;
        let key = natural_key(path, index, model, &fixture.unique_fields, &columns)?;

        let (id, action) = match find_existing(conn, model, &key)? {
            Some(id) => {
                update_record(conn, model, &id, &columns)?;
                outcome.updated += 1;
                (id, RevisionAction::Update)
            }
            None => {
                let id = insert_record(conn, model, &columns)?;
                outcome.inserted += 1;
                (id, RevisionAction::Create)
            }
        };
        if let Some(entity_type) = model.tracked_as {
            track_catalog_write(conn, entity_type, &id, action)?;
        }
    }

    Ok(outcome)
}

/// Maps a fixture record onto `(column, value)` pairs of the model table.
fn record_columns(
    conn: &Connection,
    path: &Path,
    model: &ReferenceModel,
    record: &Map<String, JsonValue>,
) -> Result<Vec<(&'static str, Value)>, BootstrapError> {
    let mut columns = Vec::with_capacity(record.len());

    for (field, value) in record {
        if let Some(fk) = model.foreign_key(field) {
            let lookup = value
                .as_object()
                .ok_or_else(|| BootstrapError::UnresolvedReference {
                    model: model.model,
                    field: fk.field,
                    lookup: value.to_string(),
                })?;
            let target = find_model(fk.model).ok_or_else(|| BootstrapError::UnknownModel {
                path: path.to_path_buf(),
                model: fk.model.to_string(),
            })?;
            let id = resolve_reference(conn, target, lookup)?.ok_or_else(|| {
                BootstrapError::UnresolvedReference {
                    model: model.model,
                    field: fk.field,
                    lookup: value.to_string(),
                }
            })?;
            columns.push((fk.column, Value::Text(id)));
            continue;
        }

        let column = model
            .column(field)
            .ok_or_else(|| BootstrapError::UnknownColumn {
                model: model.model,
                column: field.clone(),
            })?;
        columns.push((column, scalar_value(model, column, value)?));
    }

    Ok(columns)
}

fn resolve_reference(
    conn: &Connection,
    target: &ReferenceModel,
    lookup: &Map<String, JsonValue>,
) -> Result<Option<String>, BootstrapError> {
    if lookup.is_empty() {
        return Ok(None);
    }

    let mut key = Vec::with_capacity(lookup.len());
    for (field, value) in lookup {
        let column = target
            .column(field)
            .ok_or_else(|| BootstrapError::UnknownColumn {
                model: target.model,
                column: field.clone(),
            })?;
        key.push((column, scalar_value(target, column, value)?));
    }
    find_existing(conn, target, &key)
}

fn natural_key(
    path: &Path,
    index: usize,
    model: &ReferenceModel,
    unique_fields: &[String],
    columns: &[(&'static str, Value)],
) -> Result<Vec<(&'static str, Value)>, BootstrapError> {
    unique_fields
        .iter()
        .map(|field| {
            let column = model
                .foreign_key(field)
                .map_or(field.as_str(), |fk| fk.column);
            columns
                .iter()
                .find(|(name, _)| *name == column)
                .cloned()
                .ok_or_else(|| BootstrapError::InvalidFixture {
                    path: path.to_path_buf(),
                    message: format!("record {index} is missing unique field `{field}`"),
                })
        })
        .collect()
}

fn find_existing(
    conn: &Connection,
    model: &ReferenceModel,
    key: &[(&'static str, Value)],
) -> Result<Option<String>, BootstrapError> {
    let predicate = key
        .iter()
        .map(|(column, _)| format!("{column} IS ?"))
        .collect::<Vec<_>>()
        .join(" AND ");
    let sql = format!(
        "SELECT id FROM {} WHERE {predicate} AND deleted_at IS NULL ORDER BY created_at ASC, rowid ASC LIMIT 1;",
        model.table
    );
    let id = conn
        .query_row(
            &sql,
            params_from_iter(key.iter().map(|(_, value)| value)),
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(id)
}

fn insert_record(
    conn: &Connection,
    model: &ReferenceModel,
    columns: &[(&'static str, Value)],
) -> Result<String, BootstrapError> {
    let names = columns
        .iter()
        .map(|(column, _)| *column)
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; columns.len() + 1].join(", ");
    let sql = format!(
        "INSERT INTO {} (id, {names}) VALUES ({placeholders});",
        model.table
    );

    let id = Uuid::new_v4().to_string();
    let mut values = Vec::with_capacity(columns.len() + 1);
    values.push(Value::Text(id.clone()));
    values.extend(columns.iter().map(|(_, value)| value.clone()));
    conn.execute(&sql, params_from_iter(values))?;
    Ok(id)
}

fn update_record(
    conn: &Connection,
    model: &ReferenceModel,
    id: &str,
    columns: &[(&'static str, Value)],
) -> Result<(), BootstrapError> {
    let assignments = columns
        .iter()
        .map(|(column, _)| format!("{column} = ?"))
        .chain(std::iter::once("updated_at = ?".to_string()))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("UPDATE {} SET {assignments} WHERE id = ?;", model.table);

    let mut values = columns
        .iter()
        .map(|(_, value)| value.clone())
        .collect::<Vec<_>>();
    values.push(Value::Integer(now_epoch_ms()));
    values.push(Value::Text(id.to_string()));
    conn.execute(&sql, params_from_iter(values))?;
    Ok(())
}

fn scalar_value(
    model: &ReferenceModel,
    column: &'static str,
    value: &JsonValue,
) -> Result<Value, BootstrapError> {
    match value {
        JsonValue::Null => Ok(Value::Null),
        JsonValue::Bool(flag) => Ok(Value::Integer(i64::from(*flag))),
        JsonValue::Number(number) => match number.as_i64() {
            Some(integer) => Ok(Value::Integer(integer)),
            None => Ok(Value::Real(number.as_f64().unwrap_or_default())),
        },
        JsonValue::String(text) => Ok(Value::Text(text.clone())),
        JsonValue::Array(_) | JsonValue::Object(_) => Err(BootstrapError::UnknownColumn {
            model: model.model,
            column: format!("{column} (nested value)"),
        }),
    }
}
