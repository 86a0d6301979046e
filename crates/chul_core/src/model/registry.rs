//! Facility registry records that community units link to.
//!
//! Only the attributes community units and the export view need are modeled;
//! the wider registry (geography, owners, lookups) is loaded as reference data
//! by the bootstrap loader.

use crate::model::audit::AuditFields;
use crate::model::validation::{require_not_blank, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type FacilityId = Uuid;
pub type ContactTypeId = Uuid;
pub type ContactId = Uuid;

/// A registered health facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    pub name: String,
    pub code: Option<i64>,
    pub registration_number: Option<String>,
    pub number_of_beds: u32,
    pub number_of_cots: u32,
    /// Closed facilities cannot take new or updated community units.
    pub closed: bool,
    pub facility_type_id: Option<Uuid>,
    pub keph_level_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub regulatory_body_id: Option<Uuid>,
    pub operation_status_id: Option<Uuid>,
    pub ward_id: Option<Uuid>,
    pub audit: AuditFields,
}

impl Facility {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            code: None,
            registration_number: None,
            number_of_beds: 0,
            number_of_cots: 0,
            closed: false,
            facility_type_id: None,
            keph_level_id: None,
            owner_id: None,
            regulatory_body_id: None,
            operation_status_id: None,
            ward_id: None,
            audit: AuditFields::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_not_blank("name", &self.name)
    }
}

/// Kind of contact, e.g. `EMAIL`, `MOBILE`, `FAX`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactType {
    pub id: ContactTypeId,
    pub name: String,
    pub description: Option<String>,
    pub audit: AuditFields,
}

impl ContactType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            audit: AuditFields::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_not_blank("name", &self.name)
    }
}

/// One contact value of a given type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub contact: String,
    pub contact_type_id: ContactTypeId,
    pub audit: AuditFields,
}

impl Contact {
    pub fn new(contact_type_id: ContactTypeId, contact: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            contact: contact.into(),
            contact_type_id,
            audit: AuditFields::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_not_blank("contact", &self.contact)
    }
}
