//! Append-only revision log for tracked entities.
//!
//! # Invariants
//! - `(entity_type, entity_id, version)` is unique; versions start at 1 and
//!   increase by one per tracked mutation.
//! - Revisions are written on the caller's connection/transaction so they
//!   commit or roll back together with the primary mutation.

use super::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection};
use serde::Serialize;
use uuid::Uuid;

pub const ENTITY_HEALTH_UNIT: &str = "community_health_unit";
pub const ENTITY_WORKER: &str = "community_health_worker";
pub const ENTITY_RATING: &str = "chu_rating";
pub const ENTITY_STATUS: &str = "chu_status";
pub const ENTITY_SERVICE: &str = "chu_service";
pub const ENTITY_UNIT_CONTACT: &str = "chu_contact";
pub const ENTITY_WORKER_CONTACT: &str = "chu_worker_contact";
pub const ENTITY_UPDATE_BUFFER: &str = "chu_update_buffer";

/// Kind of tracked mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionAction {
    Create,
    Update,
    Delete,
}

impl RevisionAction {
    fn as_db(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// One recorded version of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Revision {
    pub entity_type: String,
    pub entity_id: Uuid,
    pub version: u32,
    pub action: RevisionAction,
    /// Entity state right after the mutation.
    pub snapshot: serde_json::Value,
    pub created_at: i64,
}

/// Appends the next revision of an entity and returns its version.
pub(crate) fn record<T: Serialize>(
    conn: &Connection,
    entity_type: &'static str,
    entity_id: Uuid,
    action: RevisionAction,
    entity: &T,
) -> RepoResult<u32> {
    let snapshot = serde_json::to_string(entity).map_err(|err| {
        RepoError::InvalidData(format!("failed to snapshot {entity_type} {entity_id}: {err}"))
    })?;

    let version = conn.query_row(
        "INSERT INTO revisions (entity_type, entity_id, version, action, snapshot)
         SELECT ?1, ?2, COALESCE(MAX(version), 0) + 1, ?3, ?4
         FROM revisions
         WHERE entity_type = ?1 AND entity_id = ?2
         RETURNING version;",
        params![entity_type, entity_id.to_string(), action.as_db(), snapshot],
        |row| row.get::<_, u32>(0),
    )?;

    Ok(version)
}

/// Lists all revisions of one entity, oldest first.
pub fn list_revisions(
    conn: &Connection,
    entity_type: &str,
    entity_id: Uuid,
) -> RepoResult<Vec<Revision>> {
    let mut stmt = conn.prepare(
        "SELECT entity_type, entity_id, version, action, snapshot, created_at
         FROM revisions
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY version ASC;",
    )?;
    let mut rows = stmt.query(params![entity_type, entity_id.to_string()])?;
    let mut revisions = Vec::new();

    while let Some(row) = rows.next()? {
        let entity_id_text: String = row.get("entity_id")?;
        let action_text: String = row.get("action")?;
        let snapshot_text: String = row.get("snapshot")?;

        let action = RevisionAction::parse(&action_text).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid action `{action_text}` in revisions.action"))
        })?;
        let snapshot = serde_json::from_str(&snapshot_text).map_err(|err| {
            RepoError::InvalidData(format!("invalid snapshot in revisions.snapshot: {err}"))
        })?;

        revisions.push(Revision {
            entity_type: row.get("entity_type")?,
            entity_id: parse_uuid("revisions", "entity_id", &entity_id_text)?,
            version: row.get("version")?,
            action,
            snapshot,
            created_at: row.get("created_at")?,
        });
    }

    Ok(revisions)
}
