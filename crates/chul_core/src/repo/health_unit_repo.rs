//! Community health unit repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist units with sequential codes and revision history.
//! - Serve the derived `contacts` and `average_rating` read models.
//!
//! # Invariants
//! - Every write validates against the live parent facility first.
//! - Code claim, row write and revision append share one IMMEDIATE transaction.
//! - A persisted code is never reassigned by later saves.

use super::registry_repo::load_facility;
use super::revision::{self, RevisionAction, ENTITY_HEALTH_UNIT, ENTITY_UNIT_CONTACT};
use super::sequence::{self, COMMUNITY_HEALTH_UNIT_SEQUENCE};
use super::{bool_to_int, parse_audit, parse_bool, parse_u32, parse_uuid, RepoError, RepoResult};
use crate::model::audit::{now_epoch_ms, AuditFields};
use crate::model::health_unit::{ChuContactView, CommunityHealthUnit, HealthUnitId};
use crate::model::registry::{ContactId, FacilityId};
use crate::model::validation::ValidationError;
use log::info;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use serde::Serialize;
use uuid::Uuid;

const UNIT_SELECT_SQL: &str = "SELECT
    id,
    name,
    code,
    facility_id,
    status_id,
    households_monitored,
    date_established,
    date_operational,
    location,
    is_approved,
    approval_comment,
    approval_date,
    is_rejected,
    rejection_reason,
    is_closed,
    closing_comment,
    created_at,
    updated_at,
    active,
    deleted_at
FROM community_health_units";

/// Query options for listing units.
#[derive(Debug, Clone, Default)]
pub struct HealthUnitListQuery {
    pub facility_id: Option<FacilityId>,
    /// `Some(true)` only approved, `Some(false)` only not-approved.
    pub approved: Option<bool>,
    pub include_rejected: bool,
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for community health units.
pub trait HealthUnitRepository {
    /// Inserts a unit, assigning `unit.code` from the unit sequence when unset.
    fn create_unit(&self, unit: &mut CommunityHealthUnit) -> RepoResult<HealthUnitId>;
    /// Persists all mutable fields. `unit.code` is reset to the persisted code.
    fn update_unit(&self, unit: &mut CommunityHealthUnit) -> RepoResult<()>;
    fn get_unit(
        &self,
        id: HealthUnitId,
        include_deleted: bool,
    ) -> RepoResult<Option<CommunityHealthUnit>>;
    fn list_units(&self, query: &HealthUnitListQuery) -> RepoResult<Vec<CommunityHealthUnit>>;
    fn soft_delete_unit(&self, id: HealthUnitId) -> RepoResult<()>;
    /// Links an existing contact to a unit and returns the link id.
    fn link_contact(&self, unit_id: HealthUnitId, contact_id: ContactId) -> RepoResult<Uuid>;
    fn list_contacts(&self, unit_id: HealthUnitId) -> RepoResult<Vec<ChuContactView>>;
    /// Mean of live ratings, `0.0` when the unit has none.
    fn average_rating(&self, unit_id: HealthUnitId) -> RepoResult<f64>;
}

/// SQLite-backed community health unit repository.
pub struct SqliteHealthUnitRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHealthUnitRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl HealthUnitRepository for SqliteHealthUnitRepository<'_> {
    fn create_unit(&self, unit: &mut CommunityHealthUnit) -> RepoResult<HealthUnitId> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let persisted = insert_unit(&tx, unit)?;
        tx.commit()?;

        info!(
            "event=chu_create module=repo status=ok unit_id={} code={}",
            persisted.id,
            persisted.code.unwrap_or_default()
        );
        *unit = persisted;
        Ok(unit.id)
    }

    fn update_unit(&self, unit: &mut CommunityHealthUnit) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let persisted = update_unit_in(&tx, unit)?;
        tx.commit()?;

        *unit = persisted;
        Ok(())
    }

    fn get_unit(
        &self,
        id: HealthUnitId,
        include_deleted: bool,
    ) -> RepoResult<Option<CommunityHealthUnit>> {
        load_unit(self.conn, id, include_deleted)
    }

    fn list_units(&self, query: &HealthUnitListQuery) -> RepoResult<Vec<CommunityHealthUnit>> {
        let mut sql = format!("{UNIT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND deleted_at IS NULL");
        }
        if !query.include_rejected {
            sql.push_str(" AND is_rejected = 0");
        }
        if let Some(facility_id) = query.facility_id {
            sql.push_str(" AND facility_id = ?");
            bind_values.push(Value::Text(facility_id.to_string()));
        }
        if let Some(approved) = query.approved {
            sql.push_str(" AND is_approved = ?");
            bind_values.push(Value::Integer(bool_to_int(approved)));
        }

        sql.push_str(" ORDER BY code ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut units = Vec::new();
        while let Some(row) = rows.next()? {
            units.push(parse_unit_row(row)?);
        }

        Ok(units)
    }

    fn soft_delete_unit(&self, id: HealthUnitId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut unit = load_unit(&tx, id, true)?.ok_or(RepoError::not_found(ENTITY_HEALTH_UNIT, id))?;
        if unit.audit.is_deleted() {
            return Ok(());
        }

        let deleted_at = now_epoch_ms();
        tx.execute(
            "UPDATE community_health_units
             SET deleted_at = ?1, updated_at = ?1
             WHERE id = ?2;",
            params![deleted_at, id.to_string()],
        )?;
        unit.audit.deleted_at = Some(deleted_at);
        unit.audit.updated_at = deleted_at;
        revision::record(&tx, ENTITY_HEALTH_UNIT, id, RevisionAction::Delete, &unit)?;
        tx.commit()?;

        Ok(())
    }

    fn link_contact(&self, unit_id: HealthUnitId, contact_id: ContactId) -> RepoResult<Uuid> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let link_id = link_contact_in(&tx, unit_id, contact_id)?;
        tx.commit()?;
        Ok(link_id)
    }

    fn list_contacts(&self, unit_id: HealthUnitId) -> RepoResult<Vec<ChuContactView>> {
        list_contacts_in(self.conn, unit_id)
    }

    fn average_rating(&self, unit_id: HealthUnitId) -> RepoResult<f64> {
        let average = self.conn.query_row(
            "SELECT AVG(rating)
             FROM chu_ratings
             WHERE health_unit_id = ?1 AND deleted_at IS NULL;",
            [unit_id.to_string()],
            |row| row.get::<_, Option<f64>>(0),
        )?;
        Ok(average.unwrap_or(0.0))
    }
}

/// Link row between a unit and one contact.
#[derive(Debug, Serialize)]
struct UnitContactLink {
    id: Uuid,
    health_unit_id: HealthUnitId,
    contact_id: ContactId,
}

/// Validates and inserts a unit on an open transaction.
///
/// Returns the persisted state, including the claimed code.
pub(crate) fn insert_unit(
    conn: &Connection,
    unit: &CommunityHealthUnit,
) -> RepoResult<CommunityHealthUnit> {
    let facility = load_facility(conn, unit.facility_id)?
        .ok_or(RepoError::not_found("facility", unit.facility_id))?;
    unit.validate(&facility)?;

    let code = match unit.code {
        Some(code) => {
            sequence::observe(conn, COMMUNITY_HEALTH_UNIT_SEQUENCE, code)?;
            code
        }
        None => sequence::claim_next(conn, COMMUNITY_HEALTH_UNIT_SEQUENCE)?,
    };

    let mut persisted = unit.clone();
    persisted.code = Some(code);
    persisted.audit.deleted_at = None;

    conn.execute(
        "INSERT INTO community_health_units (
            id,
            name,
            code,
            facility_id,
            status_id,
            households_monitored,
            date_established,
            date_operational,
            location,
            is_approved,
            approval_comment,
            approval_date,
            is_rejected,
            rejection_reason,
            is_closed,
            closing_comment,
            created_at,
            updated_at,
            active
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19);",
        params![
            persisted.id.to_string(),
            persisted.name.as_str(),
            code,
            persisted.facility_id.to_string(),
            persisted.status_id.to_string(),
            persisted.households_monitored,
            persisted.date_established,
            persisted.date_operational,
            persisted.location.as_deref(),
            bool_to_int(persisted.is_approved),
            persisted.approval_comment.as_deref(),
            persisted.approval_date,
            bool_to_int(persisted.is_rejected),
            persisted.rejection_reason.as_deref(),
            bool_to_int(persisted.is_closed),
            persisted.closing_comment.as_deref(),
            persisted.audit.created_at,
            persisted.audit.updated_at,
            bool_to_int(persisted.audit.active),
        ],
    )?;

    revision::record(
        conn,
        ENTITY_HEALTH_UNIT,
        persisted.id,
        RevisionAction::Create,
        &persisted,
    )?;
    Ok(persisted)
}

/// Validates and updates a live unit on an open transaction.
///
/// Returns the persisted state with the original code restored.
pub(crate) fn update_unit_in(
    conn: &Connection,
    unit: &CommunityHealthUnit,
) -> RepoResult<CommunityHealthUnit> {
    let existing =
        load_unit(conn, unit.id, false)?.ok_or(RepoError::not_found(ENTITY_HEALTH_UNIT, unit.id))?;

    if let (Some(persisted), Some(requested)) = (existing.code, unit.code) {
        if persisted != requested {
            return Err(ValidationError::CodeReassigned {
                persisted,
                requested,
            }
            .into());
        }
    }

    let facility = load_facility(conn, unit.facility_id)?
        .ok_or(RepoError::not_found("facility", unit.facility_id))?;
    unit.validate(&facility)?;

    let mut persisted = unit.clone();
    persisted.code = existing.code;
    persisted.audit = AuditFields {
        created_at: existing.audit.created_at,
        ..unit.audit.clone()
    };
    persisted.audit.deleted_at = None;
    persisted.audit.touch();

    conn.execute(
        "UPDATE community_health_units
         SET
            name = ?1,
            facility_id = ?2,
            status_id = ?3,
            households_monitored = ?4,
            date_established = ?5,
            date_operational = ?6,
            location = ?7,
            is_approved = ?8,
            approval_comment = ?9,
            approval_date = ?10,
            is_rejected = ?11,
            rejection_reason = ?12,
            is_closed = ?13,
            closing_comment = ?14,
            active = ?15,
            updated_at = ?16
         WHERE id = ?17;",
        params![
            persisted.name.as_str(),
            persisted.facility_id.to_string(),
            persisted.status_id.to_string(),
            persisted.households_monitored,
            persisted.date_established,
            persisted.date_operational,
            persisted.location.as_deref(),
            bool_to_int(persisted.is_approved),
            persisted.approval_comment.as_deref(),
            persisted.approval_date,
            bool_to_int(persisted.is_rejected),
            persisted.rejection_reason.as_deref(),
            bool_to_int(persisted.is_closed),
            persisted.closing_comment.as_deref(),
            bool_to_int(persisted.audit.active),
            persisted.audit.updated_at,
            persisted.id.to_string(),
        ],
    )?;

    revision::record(
        conn,
        ENTITY_HEALTH_UNIT,
        persisted.id,
        RevisionAction::Update,
        &persisted,
    )?;
    Ok(persisted)
}

pub(crate) fn load_unit(
    conn: &Connection,
    id: HealthUnitId,
    include_deleted: bool,
) -> RepoResult<Option<CommunityHealthUnit>> {
    let mut stmt = conn.prepare(&format!(
        "{UNIT_SELECT_SQL}
         WHERE id = ?1
           AND (?2 = 1 OR deleted_at IS NULL);"
    ))?;

    let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_unit_row(row)?));
    }
    Ok(None)
}

pub(crate) fn link_contact_in(
    conn: &Connection,
    unit_id: HealthUnitId,
    contact_id: ContactId,
) -> RepoResult<Uuid> {
    if load_unit(conn, unit_id, false)?.is_none() {
        return Err(RepoError::not_found(ENTITY_HEALTH_UNIT, unit_id));
    }

    let link = UnitContactLink {
        id: Uuid::new_v4(),
        health_unit_id: unit_id,
        contact_id,
    };
    conn.execute(
        "INSERT INTO chu_contacts (id, health_unit_id, contact_id) VALUES (?1, ?2, ?3);",
        params![
            link.id.to_string(),
            unit_id.to_string(),
            contact_id.to_string()
        ],
    )?;
    revision::record(
        conn,
        ENTITY_UNIT_CONTACT,
        link.id,
        RevisionAction::Create,
        &link,
    )?;
    Ok(link.id)
}

pub(crate) fn list_contacts_in(
    conn: &Connection,
    unit_id: HealthUnitId,
) -> RepoResult<Vec<ChuContactView>> {
    let mut stmt = conn.prepare(
        "SELECT
            link.id AS id,
            contact.id AS contact_id,
            contact.contact AS contact,
            contact_type.id AS contact_type,
            contact_type.name AS contact_type_name
         FROM chu_contacts link
         JOIN contacts contact ON contact.id = link.contact_id
         JOIN contact_types contact_type ON contact_type.id = contact.contact_type_id
         WHERE link.health_unit_id = ?1
           AND link.deleted_at IS NULL
           AND contact.deleted_at IS NULL
         ORDER BY link.created_at ASC, link.rowid ASC;",
    )?;

    let mut rows = stmt.query([unit_id.to_string()])?;
    let mut contacts = Vec::new();
    while let Some(row) = rows.next()? {
        let id: String = row.get("id")?;
        let contact_id: String = row.get("contact_id")?;
        let contact_type: String = row.get("contact_type")?;
        contacts.push(ChuContactView {
            id: parse_uuid("chu_contacts", "id", &id)?,
            contact_id: parse_uuid("contacts", "id", &contact_id)?,
            contact: row.get("contact")?,
            contact_type: parse_uuid("contact_types", "id", &contact_type)?,
            contact_type_name: row.get("contact_type_name")?,
        });
    }

    Ok(contacts)
}

fn parse_unit_row(row: &Row<'_>) -> RepoResult<CommunityHealthUnit> {
    const TABLE: &str = "community_health_units";
    let id: String = row.get("id")?;
    let facility_id: String = row.get("facility_id")?;
    let status_id: String = row.get("status_id")?;

    Ok(CommunityHealthUnit {
        id: parse_uuid(TABLE, "id", &id)?,
        name: row.get("name")?,
        code: Some(row.get("code")?),
        facility_id: parse_uuid(TABLE, "facility_id", &facility_id)?,
        status_id: parse_uuid(TABLE, "status_id", &status_id)?,
        households_monitored: parse_u32(
            TABLE,
            "households_monitored",
            row.get("households_monitored")?,
        )?,
        date_established: row.get("date_established")?,
        date_operational: row.get("date_operational")?,
        location: row.get("location")?,
        is_approved: parse_bool(TABLE, "is_approved", row.get("is_approved")?)?,
        approval_comment: row.get("approval_comment")?,
        approval_date: row.get("approval_date")?,
        is_rejected: parse_bool(TABLE, "is_rejected", row.get("is_rejected")?)?,
        rejection_reason: row.get("rejection_reason")?,
        is_closed: parse_bool(TABLE, "is_closed", row.get("is_closed")?)?,
        closing_comment: row.get("closing_comment")?,
        audit: parse_audit(row, TABLE)?,
    })
}
