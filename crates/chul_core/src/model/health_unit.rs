//! Community health unit domain model.
//!
//! # Responsibility
//! - Define the canonical unit record and its approval workflow flags.
//! - Validate cross-field invariants before any persist.
//!
//! # Invariants
//! - `is_approved` and `is_rejected` are never both set on a persisted unit.
//! - A unit cannot be attached to a closed facility.
//! - `code` is assigned once from the unit sequence and never reassigned.

use crate::model::audit::AuditFields;
use crate::model::catalog::StatusId;
use crate::model::registry::{ContactId, ContactTypeId, Facility, FacilityId};
use crate::model::validation::{require_not_blank, ValidationError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type HealthUnitId = Uuid;

/// Health service delivery structure covering roughly 5,000 people, tied to
/// one parent facility and staffed by CHEWs and volunteers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityHealthUnit {
    pub id: HealthUnitId,
    pub name: String,
    /// `None` until first save; then fixed for the unit lifetime.
    pub code: Option<i64>,
    pub facility_id: FacilityId,
    pub status_id: StatusId,
    pub households_monitored: u32,
    pub date_established: NaiveDate,
    pub date_operational: Option<NaiveDate>,
    pub location: Option<String>,
    pub is_approved: bool,
    pub approval_comment: Option<String>,
    pub approval_date: Option<DateTime<Utc>>,
    pub is_rejected: bool,
    pub rejection_reason: Option<String>,
    pub is_closed: bool,
    pub closing_comment: Option<String>,
    pub audit: AuditFields,
}

impl CommunityHealthUnit {
    /// Creates a pending unit established today.
    pub fn new(name: impl Into<String>, facility_id: FacilityId, status_id: StatusId) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            code: None,
            facility_id,
            status_id,
            households_monitored: 0,
            date_established: Utc::now().date_naive(),
            date_operational: None,
            location: None,
            is_approved: false,
            approval_comment: None,
            approval_date: None,
            is_rejected: false,
            rejection_reason: None,
            is_closed: false,
            closing_comment: None,
            audit: AuditFields::new(),
        }
    }

    /// Validates the unit against its parent facility.
    ///
    /// # Errors
    /// - `Blank { field: "name" }` for an empty name.
    /// - `FacilityClosed` when `facility.closed` is set.
    /// - `ApprovedAndRejected` when both workflow flags are set.
    pub fn validate(&self, facility: &Facility) -> Result<(), ValidationError> {
        require_not_blank("name", &self.name)?;
        self.validate_facility_is_not_closed(facility)?;
        self.validate_either_approved_or_rejected()
    }

    fn validate_facility_is_not_closed(&self, facility: &Facility) -> Result<(), ValidationError> {
        if facility.closed {
            return Err(ValidationError::FacilityClosed);
        }
        Ok(())
    }

    fn validate_either_approved_or_rejected(&self) -> Result<(), ValidationError> {
        if self.is_approved && self.is_rejected {
            return Err(ValidationError::ApprovedAndRejected);
        }
        Ok(())
    }

    /// Flags the unit approved. Does not clear a previous rejection.
    pub fn approve(&mut self, comment: Option<String>) {
        self.is_approved = true;
        self.approval_comment = comment;
        self.approval_date = Some(Utc::now());
    }

    /// Flags the unit rejected. Does not clear a previous approval.
    pub fn reject(&mut self, reason: Option<String>) {
        self.is_rejected = true;
        self.rejection_reason = reason;
    }

    pub fn close(&mut self, comment: Option<String>) {
        self.is_closed = true;
        self.closing_comment = comment;
    }

    /// Neither approved, rejected nor closed.
    pub fn is_pending(&self) -> bool {
        !self.is_approved && !self.is_rejected && !self.is_closed
    }
}

/// Read-only projection of one contact linked to a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChuContactView {
    /// Link row id.
    pub id: Uuid,
    pub contact_id: ContactId,
    pub contact: String,
    pub contact_type: ContactTypeId,
    pub contact_type_name: String,
}

#[cfg(test)]
mod tests {
    use super::CommunityHealthUnit;
    use crate::model::registry::Facility;
    use crate::model::validation::ValidationError;
    use uuid::Uuid;

    fn unit_for(facility: &Facility) -> CommunityHealthUnit {
        CommunityHealthUnit::new("Kibera East", facility.id, Uuid::new_v4())
    }

    #[test]
    fn new_unit_is_pending_without_code() {
        let facility = Facility::new("Kibera HC");
        let unit = unit_for(&facility);
        assert!(unit.is_pending());
        assert!(unit.code.is_none());
        assert!(unit.validate(&facility).is_ok());
    }

    #[test]
    fn closed_facility_fails_on_facility_field() {
        let mut facility = Facility::new("Kibera HC");
        facility.closed = true;
        let err = unit_for(&facility).validate(&facility).unwrap_err();
        assert_eq!(err, ValidationError::FacilityClosed);
        assert_eq!(err.field(), "facility");
    }

    #[test]
    fn approve_then_reject_conflicts() {
        let facility = Facility::new("Kibera HC");
        let mut unit = unit_for(&facility);
        unit.approve(Some("ok".to_string()));
        assert!(unit.approval_date.is_some());
        unit.reject(None);

        let err = unit.validate(&facility).unwrap_err();
        assert_eq!(err.field(), "approve/reject");
    }
}
