//! Facility and contact persistence.
//!
//! Facilities are owned by the wider registry; this repository only covers
//! what community units need: registering a facility, reading it for
//! validation, and toggling its closed flag.

use super::{bool_to_int, parse_audit, parse_audit_raw, parse_bool, parse_optional_uuid, parse_u32, parse_uuid};
use super::{RepoError, RepoResult};
use crate::model::audit::now_epoch_ms;
use crate::model::registry::{Contact, ContactId, ContactType, ContactTypeId, Facility, FacilityId};
use rusqlite::{params, Connection, OptionalExtension, Row};

const FACILITY_SELECT_SQL: &str = "SELECT
    id,
    name,
    code,
    registration_number,
    number_of_beds,
    number_of_cots,
    closed,
    facility_type_id,
    keph_level_id,
    owner_id,
    regulatory_body_id,
    operation_status_id,
    ward_id,
    created_at,
    updated_at,
    active,
    deleted_at
FROM facilities";

/// Repository interface for facilities and contacts.
pub trait RegistryRepository {
    fn create_facility(&self, facility: &Facility) -> RepoResult<FacilityId>;
    fn get_facility(&self, id: FacilityId) -> RepoResult<Option<Facility>>;
    fn set_facility_closed(&self, id: FacilityId, closed: bool) -> RepoResult<()>;
    fn create_contact_type(&self, contact_type: &ContactType) -> RepoResult<ContactTypeId>;
    fn find_contact_type(&self, name: &str) -> RepoResult<Option<ContactType>>;
    fn create_contact(&self, contact: &Contact) -> RepoResult<ContactId>;
    fn get_contact(&self, id: ContactId) -> RepoResult<Option<Contact>>;
}

/// SQLite-backed registry repository.
pub struct SqliteRegistryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRegistryRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RegistryRepository for SqliteRegistryRepository<'_> {
    fn create_facility(&self, facility: &Facility) -> RepoResult<FacilityId> {
        facility.validate()?;

        self.conn.execute(
            "INSERT INTO facilities (
                id,
                name,
                code,
                registration_number,
                number_of_beds,
                number_of_cots,
                closed,
                facility_type_id,
                keph_level_id,
                owner_id,
                regulatory_body_id,
                operation_status_id,
                ward_id,
                created_at,
                updated_at,
                active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16);",
            params![
                facility.id.to_string(),
                facility.name.as_str(),
                facility.code,
                facility.registration_number.as_deref(),
                facility.number_of_beds,
                facility.number_of_cots,
                bool_to_int(facility.closed),
                facility.facility_type_id.map(|id| id.to_string()),
                facility.keph_level_id.map(|id| id.to_string()),
                facility.owner_id.map(|id| id.to_string()),
                facility.regulatory_body_id.map(|id| id.to_string()),
                facility.operation_status_id.map(|id| id.to_string()),
                facility.ward_id.map(|id| id.to_string()),
                facility.audit.created_at,
                facility.audit.updated_at,
                bool_to_int(facility.audit.active),
            ],
        )?;

        Ok(facility.id)
    }

    fn get_facility(&self, id: FacilityId) -> RepoResult<Option<Facility>> {
        load_facility(self.conn, id)
    }

    fn set_facility_closed(&self, id: FacilityId, closed: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE facilities
             SET
                closed = ?1,
                updated_at = MAX(created_at, ?2)
             WHERE id = ?3 AND deleted_at IS NULL;",
            params![bool_to_int(closed), now_epoch_ms(), id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("facility", id));
        }
        Ok(())
    }

    fn create_contact_type(&self, contact_type: &ContactType) -> RepoResult<ContactTypeId> {
        contact_type.validate()?;
        self.conn.execute(
            "INSERT INTO contact_types (id, name, description, created_at, updated_at, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                contact_type.id.to_string(),
                contact_type.name.as_str(),
                contact_type.description.as_deref(),
                contact_type.audit.created_at,
                contact_type.audit.updated_at,
                bool_to_int(contact_type.audit.active),
            ],
        )?;
        Ok(contact_type.id)
    }

    fn find_contact_type(&self, name: &str) -> RepoResult<Option<ContactType>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, description, created_at, updated_at, active, deleted_at
                 FROM contact_types
                 WHERE name = ?1 AND deleted_at IS NULL;",
                [name],
                |row| {
                    Ok((
                        row.get::<_, String>("id")?,
                        row.get::<_, String>("name")?,
                        row.get::<_, Option<String>>("description")?,
                        parse_audit_raw(row)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, name, description, audit)| {
            Ok(ContactType {
                id: parse_uuid("contact_types", "id", &id)?,
                name,
                description,
                audit: audit.into_fields("contact_types")?,
            })
        })
        .transpose()
    }

    fn create_contact(&self, contact: &Contact) -> RepoResult<ContactId> {
        insert_contact(self.conn, contact)?;
        Ok(contact.id)
    }

    fn get_contact(&self, id: ContactId) -> RepoResult<Option<Contact>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, contact, contact_type_id, created_at, updated_at, active, deleted_at
                 FROM contacts
                 WHERE id = ?1 AND deleted_at IS NULL;",
                [id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>("contact")?,
                        row.get::<_, String>("contact_type_id")?,
                        parse_audit_raw(row)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(contact, contact_type_id, audit)| {
            Ok(Contact {
                id,
                contact,
                contact_type_id: parse_uuid("contacts", "contact_type_id", &contact_type_id)?,
                audit: audit.into_fields("contacts")?,
            })
        })
        .transpose()
    }
}

/// Loads one live facility by id on any connection or transaction.
pub(crate) fn load_facility(conn: &Connection, id: FacilityId) -> RepoResult<Option<Facility>> {
    let mut stmt = conn.prepare(&format!(
        "{FACILITY_SELECT_SQL} WHERE id = ?1 AND deleted_at IS NULL;"
    ))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_facility_row(row)?));
    }
    Ok(None)
}

pub(crate) fn insert_contact(conn: &Connection, contact: &Contact) -> RepoResult<()> {
    contact.validate()?;
    conn.execute(
        "INSERT INTO contacts (id, contact, contact_type_id, created_at, updated_at, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            contact.id.to_string(),
            contact.contact.as_str(),
            contact.contact_type_id.to_string(),
            contact.audit.created_at,
            contact.audit.updated_at,
            bool_to_int(contact.audit.active),
        ],
    )?;
    Ok(())
}

fn parse_facility_row(row: &Row<'_>) -> RepoResult<Facility> {
    let id_text: String = row.get("id")?;
    Ok(Facility {
        id: parse_uuid("facilities", "id", &id_text)?,
        name: row.get("name")?,
        code: row.get("code")?,
        registration_number: row.get("registration_number")?,
        number_of_beds: parse_u32("facilities", "number_of_beds", row.get("number_of_beds")?)?,
        number_of_cots: parse_u32("facilities", "number_of_cots", row.get("number_of_cots")?)?,
        closed: parse_bool("facilities", "closed", row.get("closed")?)?,
        facility_type_id: parse_optional_uuid("facilities", "facility_type_id", row.get("facility_type_id")?)?,
        keph_level_id: parse_optional_uuid("facilities", "keph_level_id", row.get("keph_level_id")?)?,
        owner_id: parse_optional_uuid("facilities", "owner_id", row.get("owner_id")?)?,
        regulatory_body_id: parse_optional_uuid("facilities", "regulatory_body_id", row.get("regulatory_body_id")?)?,
        operation_status_id: parse_optional_uuid("facilities", "operation_status_id", row.get("operation_status_id")?)?,
        ward_id: parse_optional_uuid("facilities", "ward_id", row.get("ward_id")?)?,
        audit: parse_audit(row, "facilities")?,
    })
}
