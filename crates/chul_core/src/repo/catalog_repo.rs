//! Status and CHU service catalog repository.

use super::revision::{self, RevisionAction, ENTITY_SERVICE, ENTITY_STATUS};
use super::{bool_to_int, parse_audit, parse_uuid, RepoError, RepoResult};
use crate::model::catalog::{ChuService, ChuServiceId, Status, StatusId};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

pub trait CatalogRepository {
    fn create_status(&self, status: &Status) -> RepoResult<StatusId>;
    fn get_status(&self, id: StatusId) -> RepoResult<Option<Status>>;
    fn list_statuses(&self) -> RepoResult<Vec<Status>>;
    fn create_service(&self, service: &ChuService) -> RepoResult<ChuServiceId>;
    fn list_services(&self) -> RepoResult<Vec<ChuService>>;
}

pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn create_status(&self, status: &Status) -> RepoResult<StatusId> {
        status.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO chu_statuses (id, name, description, created_at, updated_at, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                status.id.to_string(),
                status.name.as_str(),
                status.description.as_deref(),
                status.audit.created_at,
                status.audit.updated_at,
                bool_to_int(status.audit.active),
            ],
        )?;
        revision::record(&tx, ENTITY_STATUS, status.id, RevisionAction::Create, status)?;
        tx.commit()?;
        Ok(status.id)
    }

    fn get_status(&self, id: StatusId) -> RepoResult<Option<Status>> {
        load_status(self.conn, id)
    }

    fn list_statuses(&self) -> RepoResult<Vec<Status>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, created_at, updated_at, active, deleted_at
             FROM chu_statuses
             WHERE deleted_at IS NULL
             ORDER BY name ASC, id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut statuses = Vec::new();
        while let Some(row) = rows.next()? {
            statuses.push(parse_status_row(row)?);
        }
        Ok(statuses)
    }

    fn create_service(&self, service: &ChuService) -> RepoResult<ChuServiceId> {
        service.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO chu_services (id, name, description, created_at, updated_at, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                service.id.to_string(),
                service.name.as_str(),
                service.description.as_deref(),
                service.audit.created_at,
                service.audit.updated_at,
                bool_to_int(service.audit.active),
            ],
        )?;
        revision::record(&tx, ENTITY_SERVICE, service.id, RevisionAction::Create, service)?;
        tx.commit()?;
        Ok(service.id)
    }

    fn list_services(&self) -> RepoResult<Vec<ChuService>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, created_at, updated_at, active, deleted_at
             FROM chu_services
             WHERE deleted_at IS NULL
             ORDER BY name ASC, id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut services = Vec::new();
        while let Some(row) = rows.next()? {
            services.push(parse_service_row(row)?);
        }
        Ok(services)
    }
}

/// Validates a catalog row written by the bootstrap loader and appends its
/// revision on the same connection.
pub(crate) fn track_catalog_write(
    conn: &Connection,
    entity_type: &'static str,
    id: &str,
    action: RevisionAction,
) -> RepoResult<()> {
    match entity_type {
        ENTITY_STATUS => {
            let id = parse_uuid("chu_statuses", "id", id)?;
            let status = load_status(conn, id)?.ok_or(RepoError::not_found(ENTITY_STATUS, id))?;
            status.validate()?;
            revision::record(conn, ENTITY_STATUS, id, action, &status)?;
        }
        ENTITY_SERVICE => {
            let id = parse_uuid("chu_services", "id", id)?;
            let service =
                load_service(conn, id)?.ok_or(RepoError::not_found(ENTITY_SERVICE, id))?;
            service.validate()?;
            revision::record(conn, ENTITY_SERVICE, id, action, &service)?;
        }
        other => {
            return Err(RepoError::InvalidData(format!(
                "`{other}` is not a catalog entity"
            )))
        }
    }
    Ok(())
}

fn load_status(conn: &Connection, id: StatusId) -> RepoResult<Option<Status>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, created_at, updated_at, active, deleted_at
         FROM chu_statuses
         WHERE id = ?1 AND deleted_at IS NULL;",
    )?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_status_row(row)?));
    }
    Ok(None)
}

fn load_service(conn: &Connection, id: ChuServiceId) -> RepoResult<Option<ChuService>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, created_at, updated_at, active, deleted_at
         FROM chu_services
         WHERE id = ?1 AND deleted_at IS NULL;",
    )?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_service_row(row)?));
    }
    Ok(None)
}

fn parse_service_row(row: &Row<'_>) -> RepoResult<ChuService> {
    let id: String = row.get("id")?;
    Ok(ChuService {
        id: parse_uuid("chu_services", "id", &id)?,
        name: row.get("name")?,
        description: row.get("description")?,
        audit: parse_audit(row, "chu_services")?,
    })
}

fn parse_status_row(row: &Row<'_>) -> RepoResult<Status> {
    let id: String = row.get("id")?;
    Ok(Status {
        id: parse_uuid("chu_statuses", "id", &id)?,
        name: row.get("name")?,
        description: row.get("description")?,
        audit: parse_audit(row, "chu_statuses")?,
    })
}
