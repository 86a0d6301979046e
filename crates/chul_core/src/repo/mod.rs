//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per aggregate.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Write paths validate before SQL mutations.
//! - Tracked mutations append a revision in the same transaction.
//! - Default reads hide soft-deleted rows (`deleted_at IS NOT NULL`).

pub mod buffer_repo;
pub mod catalog_repo;
pub mod error;
pub mod health_unit_repo;
pub mod rating_repo;
pub mod registry_repo;
pub mod revision;
pub mod sequence;
pub mod worker_repo;

pub use error::{RepoError, RepoResult};

use crate::model::audit::AuditFields;
use rusqlite::Row;
use uuid::Uuid;

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn parse_bool(table: &str, column: &str, value: i64) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {table}.{column}"
        ))),
    }
}

fn parse_uuid(table: &str, column: &str, value: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{value}` in {table}.{column}"))
    })
}

fn parse_optional_uuid(table: &str, column: &str, value: Option<String>) -> RepoResult<Option<Uuid>> {
    value
        .map(|text| parse_uuid(table, column, &text))
        .transpose()
}

fn parse_u32(table: &str, column: &str, value: i64) -> RepoResult<u32> {
    u32::try_from(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid unsigned value `{value}` in {table}.{column}"))
    })
}

/// Audit columns as read from SQLite, before boolean checks.
struct RawAudit {
    created_at: i64,
    updated_at: i64,
    active: i64,
    deleted_at: Option<i64>,
}

impl RawAudit {
    pub(crate) fn into_fields(self, table: &str) -> RepoResult<AuditFields> {
        Ok(AuditFields {
            created_at: self.created_at,
            updated_at: self.updated_at,
            active: parse_bool(table, "active", self.active)?,
            deleted_at: self.deleted_at,
        })
    }
}

fn parse_audit_raw(row: &Row<'_>) -> rusqlite::Result<RawAudit> {
    Ok(RawAudit {
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        active: row.get("active")?,
        deleted_at: row.get("deleted_at")?,
    })
}

/// Reads the shared audit columns of any table.
fn parse_audit(row: &Row<'_>, table: &str) -> RepoResult<AuditFields> {
    parse_audit_raw(row)?.into_fields(table)
}
