//! Pending-update buffer persistence.
//!
//! Merging a buffer into its unit lives in `service::update_buffer_service`;
//! this module only stores, reads and resolves buffer rows.

use super::health_unit_repo::load_unit;
use super::revision::{self, RevisionAction, ENTITY_HEALTH_UNIT, ENTITY_UPDATE_BUFFER};
use super::{bool_to_int, parse_audit, parse_bool, parse_uuid, RepoError, RepoResult};
use crate::model::audit::now_epoch_ms;
use crate::model::health_unit::HealthUnitId;
use crate::model::update_buffer::{BufferId, ChuUpdateBuffer};
use rusqlite::{params, Connection, Row};

const BUFFER_SELECT_SQL: &str = "SELECT
    id,
    health_unit_id,
    basic,
    workers,
    contacts,
    is_approved,
    is_rejected,
    created_at,
    updated_at,
    active,
    deleted_at
FROM chu_update_buffers";

/// How a buffer was resolved by a reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferResolution {
    Approved,
    Rejected,
}

pub(crate) fn insert_buffer(conn: &Connection, buffer: &ChuUpdateBuffer) -> RepoResult<()> {
    buffer.validate()?;
    if load_unit(conn, buffer.health_unit_id, false)?.is_none() {
        return Err(RepoError::not_found(
            ENTITY_HEALTH_UNIT,
            buffer.health_unit_id,
        ));
    }

    conn.execute(
        "INSERT INTO chu_update_buffers (
            id,
            health_unit_id,
            basic,
            workers,
            contacts,
            is_approved,
            is_rejected,
            created_at,
            updated_at,
            active
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
        params![
            buffer.id.to_string(),
            buffer.health_unit_id.to_string(),
            buffer.basic.as_deref(),
            buffer.workers.as_deref(),
            buffer.contacts.as_deref(),
            bool_to_int(buffer.is_approved),
            bool_to_int(buffer.is_rejected),
            buffer.audit.created_at,
            buffer.audit.updated_at,
            bool_to_int(buffer.audit.active),
        ],
    )?;
    revision::record(
        conn,
        ENTITY_UPDATE_BUFFER,
        buffer.id,
        RevisionAction::Create,
        buffer,
    )?;
    Ok(())
}

pub(crate) fn load_buffer(conn: &Connection, id: BufferId) -> RepoResult<Option<ChuUpdateBuffer>> {
    let mut stmt = conn.prepare(&format!(
        "{BUFFER_SELECT_SQL} WHERE id = ?1 AND deleted_at IS NULL;"
    ))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_buffer_row(row)?));
    }
    Ok(None)
}

/// Unresolved buffers of one unit, oldest first.
pub(crate) fn list_pending(
    conn: &Connection,
    unit_id: HealthUnitId,
) -> RepoResult<Vec<ChuUpdateBuffer>> {
    let mut stmt = conn.prepare(&format!(
        "{BUFFER_SELECT_SQL}
         WHERE health_unit_id = ?1
           AND is_approved = 0
           AND is_rejected = 0
           AND deleted_at IS NULL
         ORDER BY created_at ASC, rowid ASC;"
    ))?;
    let mut rows = stmt.query([unit_id.to_string()])?;
    let mut buffers = Vec::new();
    while let Some(row) = rows.next()? {
        buffers.push(parse_buffer_row(row)?);
    }
    Ok(buffers)
}

/// Marks a pending buffer resolved and returns its final state.
///
/// Returns `Conflict` when the buffer was already resolved.
pub(crate) fn mark_resolved(
    conn: &Connection,
    id: BufferId,
    resolution: BufferResolution,
) -> RepoResult<ChuUpdateBuffer> {
    let (approved, rejected) = match resolution {
        BufferResolution::Approved => (true, false),
        BufferResolution::Rejected => (false, true),
    };

    let changed = conn.execute(
        "UPDATE chu_update_buffers
         SET
            is_approved = ?1,
            is_rejected = ?2,
            updated_at = MAX(created_at, ?3)
         WHERE id = ?4
           AND is_approved = 0
           AND is_rejected = 0
           AND deleted_at IS NULL;",
        params![
            bool_to_int(approved),
            bool_to_int(rejected),
            now_epoch_ms(),
            id.to_string()
        ],
    )?;
    if changed == 0 {
        return match load_buffer(conn, id)? {
            Some(_) => Err(RepoError::Conflict(format!(
                "update buffer {id} is already resolved"
            ))),
            None => Err(RepoError::not_found(ENTITY_UPDATE_BUFFER, id)),
        };
    }

    let buffer = load_buffer(conn, id)?.ok_or(RepoError::not_found(ENTITY_UPDATE_BUFFER, id))?;
    revision::record(conn, ENTITY_UPDATE_BUFFER, id, RevisionAction::Update, &buffer)?;
    Ok(buffer)
}

fn parse_buffer_row(row: &Row<'_>) -> RepoResult<ChuUpdateBuffer> {
    const TABLE: &str = "chu_update_buffers";
    let id: String = row.get("id")?;
    let health_unit_id: String = row.get("health_unit_id")?;

    Ok(ChuUpdateBuffer {
        id: parse_uuid(TABLE, "id", &id)?,
        health_unit_id: parse_uuid(TABLE, "health_unit_id", &health_unit_id)?,
        basic: row.get("basic")?,
        workers: row.get("workers")?,
        contacts: row.get("contacts")?,
        is_approved: parse_bool(TABLE, "is_approved", row.get("is_approved")?)?,
        is_rejected: parse_bool(TABLE, "is_rejected", row.get("is_rejected")?)?,
        audit: parse_audit(row, TABLE)?,
    })
}
