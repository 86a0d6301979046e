//! Community health worker repository.
//!
//! # Invariants
//! - Workers attach only to live units.
//! - `(id_number, health_unit_id)` is unique when `id_number` is set; a clash
//!   surfaces as `RepoError::Conflict`.

use super::health_unit_repo::load_unit;
use super::revision::{self, RevisionAction, ENTITY_HEALTH_UNIT, ENTITY_WORKER, ENTITY_WORKER_CONTACT};
use super::{bool_to_int, parse_audit, parse_bool, parse_u32, parse_uuid, RepoError, RepoResult};
use crate::model::audit::{now_epoch_ms, AuditFields};
use crate::model::health_unit::{ChuContactView, HealthUnitId};
use crate::model::registry::ContactId;
use crate::model::worker::{CommunityHealthWorker, WorkerId};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use serde::Serialize;
use uuid::Uuid;

const WORKER_SELECT_SQL: &str = "SELECT
    id,
    first_name,
    last_name,
    id_number,
    is_incharge,
    health_unit_id,
    created_at,
    updated_at,
    active,
    deleted_at
FROM community_health_workers";

/// Repository interface for unit workers and their contacts.
pub trait WorkerRepository {
    fn create_worker(&self, worker: &CommunityHealthWorker) -> RepoResult<WorkerId>;
    fn update_worker(&self, worker: &CommunityHealthWorker) -> RepoResult<()>;
    fn get_worker(
        &self,
        id: WorkerId,
        include_deleted: bool,
    ) -> RepoResult<Option<CommunityHealthWorker>>;
    /// Live workers of one unit, in-charge first then by name.
    fn list_workers(&self, unit_id: HealthUnitId) -> RepoResult<Vec<CommunityHealthWorker>>;
    fn soft_delete_worker(&self, id: WorkerId) -> RepoResult<()>;
    fn link_contact(&self, worker_id: WorkerId, contact_id: ContactId) -> RepoResult<Uuid>;
    /// Same projection as unit contacts, scoped to one worker.
    fn list_contacts(&self, worker_id: WorkerId) -> RepoResult<Vec<ChuContactView>>;
}

/// SQLite-backed worker repository.
pub struct SqliteWorkerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteWorkerRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl WorkerRepository for SqliteWorkerRepository<'_> {
    fn create_worker(&self, worker: &CommunityHealthWorker) -> RepoResult<WorkerId> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        insert_worker(&tx, worker)?;
        tx.commit()?;
        Ok(worker.id)
    }

    fn update_worker(&self, worker: &CommunityHealthWorker) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        update_worker_in(&tx, worker)?;
        tx.commit()?;
        Ok(())
    }

    fn get_worker(
        &self,
        id: WorkerId,
        include_deleted: bool,
    ) -> RepoResult<Option<CommunityHealthWorker>> {
        load_worker(self.conn, id, include_deleted)
    }

    fn list_workers(&self, unit_id: HealthUnitId) -> RepoResult<Vec<CommunityHealthWorker>> {
        let mut stmt = self.conn.prepare(&format!(
            "{WORKER_SELECT_SQL}
             WHERE health_unit_id = ?1 AND deleted_at IS NULL
             ORDER BY is_incharge DESC, first_name ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([unit_id.to_string()])?;
        let mut workers = Vec::new();
        while let Some(row) = rows.next()? {
            workers.push(parse_worker_row(row)?);
        }
        Ok(workers)
    }

    fn soft_delete_worker(&self, id: WorkerId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut worker =
            load_worker(&tx, id, true)?.ok_or(RepoError::not_found(ENTITY_WORKER, id))?;
        if worker.audit.is_deleted() {
            return Ok(());
        }

        let deleted_at = now_epoch_ms();
        tx.execute(
            "UPDATE community_health_workers
             SET deleted_at = ?1, updated_at = ?1
             WHERE id = ?2;",
            params![deleted_at, id.to_string()],
        )?;
        worker.audit.deleted_at = Some(deleted_at);
        worker.audit.updated_at = deleted_at;
        revision::record(&tx, ENTITY_WORKER, id, RevisionAction::Delete, &worker)?;
        tx.commit()?;
        Ok(())
    }

    fn link_contact(&self, worker_id: WorkerId, contact_id: ContactId) -> RepoResult<Uuid> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if load_worker(&tx, worker_id, false)?.is_none() {
            return Err(RepoError::not_found(ENTITY_WORKER, worker_id));
        }

        let link = WorkerContactLink {
            id: Uuid::new_v4(),
            health_worker_id: worker_id,
            contact_id,
        };
        tx.execute(
            "INSERT INTO chu_worker_contacts (id, health_worker_id, contact_id)
             VALUES (?1, ?2, ?3);",
            params![
                link.id.to_string(),
                worker_id.to_string(),
                contact_id.to_string()
            ],
        )?;
        revision::record(
            &tx,
            ENTITY_WORKER_CONTACT,
            link.id,
            RevisionAction::Create,
            &link,
        )?;
        tx.commit()?;
        Ok(link.id)
    }

    fn list_contacts(&self, worker_id: WorkerId) -> RepoResult<Vec<ChuContactView>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                link.id AS id,
                contact.id AS contact_id,
                contact.contact AS contact,
                contact_type.id AS contact_type,
                contact_type.name AS contact_type_name
             FROM chu_worker_contacts link
             JOIN contacts contact ON contact.id = link.contact_id
             JOIN contact_types contact_type ON contact_type.id = contact.contact_type_id
             WHERE link.health_worker_id = ?1
               AND link.deleted_at IS NULL
               AND contact.deleted_at IS NULL
             ORDER BY link.created_at ASC, link.rowid ASC;",
        )?;
        let mut rows = stmt.query([worker_id.to_string()])?;
        let mut contacts = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get("id")?;
            let contact_id: String = row.get("contact_id")?;
            let contact_type: String = row.get("contact_type")?;
            contacts.push(ChuContactView {
                id: parse_uuid("chu_worker_contacts", "id", &id)?,
                contact_id: parse_uuid("contacts", "id", &contact_id)?,
                contact: row.get("contact")?,
                contact_type: parse_uuid("contact_types", "id", &contact_type)?,
                contact_type_name: row.get("contact_type_name")?,
            });
        }
        Ok(contacts)
    }
}

#[derive(Debug, Serialize)]
struct WorkerContactLink {
    id: Uuid,
    health_worker_id: WorkerId,
    contact_id: ContactId,
}

pub(crate) fn insert_worker(conn: &Connection, worker: &CommunityHealthWorker) -> RepoResult<()> {
    worker.validate()?;
    if load_unit(conn, worker.health_unit_id, false)?.is_none() {
        return Err(RepoError::not_found(
            ENTITY_HEALTH_UNIT,
            worker.health_unit_id,
        ));
    }

    conn.execute(
        "INSERT INTO community_health_workers (
            id,
            first_name,
            last_name,
            id_number,
            is_incharge,
            health_unit_id,
            created_at,
            updated_at,
            active
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
        params![
            worker.id.to_string(),
            worker.first_name.as_str(),
            worker.last_name.as_deref(),
            worker.id_number,
            bool_to_int(worker.is_incharge),
            worker.health_unit_id.to_string(),
            worker.audit.created_at,
            worker.audit.updated_at,
            bool_to_int(worker.audit.active),
        ],
    )?;
    revision::record(conn, ENTITY_WORKER, worker.id, RevisionAction::Create, worker)?;
    Ok(())
}

pub(crate) fn update_worker_in(
    conn: &Connection,
    worker: &CommunityHealthWorker,
) -> RepoResult<CommunityHealthWorker> {
    worker.validate()?;
    let existing = load_worker(conn, worker.id, false)?
        .filter(|existing| existing.health_unit_id == worker.health_unit_id)
        .ok_or(RepoError::not_found(ENTITY_WORKER, worker.id))?;

    let mut persisted = worker.clone();
    persisted.audit = AuditFields {
        created_at: existing.audit.created_at,
        ..worker.audit.clone()
    };
    persisted.audit.deleted_at = None;
    persisted.audit.touch();

    conn.execute(
        "UPDATE community_health_workers
         SET
            first_name = ?1,
            last_name = ?2,
            id_number = ?3,
            is_incharge = ?4,
            active = ?5,
            updated_at = ?6
         WHERE id = ?7;",
        params![
            persisted.first_name.as_str(),
            persisted.last_name.as_deref(),
            persisted.id_number,
            bool_to_int(persisted.is_incharge),
            bool_to_int(persisted.audit.active),
            persisted.audit.updated_at,
            persisted.id.to_string(),
        ],
    )?;

    revision::record(conn, ENTITY_WORKER, persisted.id, RevisionAction::Update, &persisted)?;
    Ok(persisted)
}

pub(crate) fn load_worker(
    conn: &Connection,
    id: WorkerId,
    include_deleted: bool,
) -> RepoResult<Option<CommunityHealthWorker>> {
    let mut stmt = conn.prepare(&format!(
        "{WORKER_SELECT_SQL}
         WHERE id = ?1
           AND (?2 = 1 OR deleted_at IS NULL);"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_worker_row(row)?));
    }
    Ok(None)
}

fn parse_worker_row(row: &Row<'_>) -> RepoResult<CommunityHealthWorker> {
    const TABLE: &str = "community_health_workers";
    let id: String = row.get("id")?;
    let health_unit_id: String = row.get("health_unit_id")?;
    let id_number = row
        .get::<_, Option<i64>>("id_number")?
        .map(|value| parse_u32(TABLE, "id_number", value))
        .transpose()?;

    Ok(CommunityHealthWorker {
        id: parse_uuid(TABLE, "id", &id)?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        id_number,
        is_incharge: parse_bool(TABLE, "is_incharge", row.get("is_incharge")?)?,
        health_unit_id: parse_uuid(TABLE, "health_unit_id", &health_unit_id)?,
        audit: parse_audit(row, TABLE)?,
    })
}
