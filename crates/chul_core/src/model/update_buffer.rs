//! Pending-update buffer for community health units.
//!
//! # Responsibility
//! - Stage proposed edits to a unit's basic details, workers and contacts.
//! - Hold them as serialized payloads until a reviewer approves or rejects.
//!
//! # Invariants
//! - A buffer carries at least one payload.
//! - A buffer is resolved at most once (approved xor rejected).

use crate::model::audit::AuditFields;
use crate::model::catalog::StatusId;
use crate::model::health_unit::HealthUnitId;
use crate::model::registry::ContactTypeId;
use crate::model::validation::ValidationError;
use crate::model::worker::WorkerId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type BufferId = Uuid;

/// Patch of a unit's basic fields. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicDetailsUpdate {
    pub name: Option<String>,
    pub status_id: Option<StatusId>,
    pub households_monitored: Option<u32>,
    pub date_established: Option<NaiveDate>,
    pub date_operational: Option<NaiveDate>,
    pub location: Option<String>,
}

/// Proposed worker. With `id` it updates that worker, without it adds one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerUpdate {
    #[serde(default)]
    pub id: Option<WorkerId>,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub id_number: Option<u32>,
    #[serde(default)]
    pub is_incharge: bool,
}

/// Proposed contact to link to the unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactUpdate {
    pub contact_type_id: ContactTypeId,
    pub contact: String,
}

/// Stored buffer row. Payloads stay as JSON text until applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChuUpdateBuffer {
    pub id: BufferId,
    pub health_unit_id: HealthUnitId,
    pub basic: Option<String>,
    pub workers: Option<String>,
    pub contacts: Option<String>,
    pub is_approved: bool,
    pub is_rejected: bool,
    pub audit: AuditFields,
}

impl ChuUpdateBuffer {
    /// Serializes the provided payloads into a new pending buffer.
    ///
    /// # Errors
    /// - `EmptyUpdate` when all three payloads are `None`.
    pub fn stage(
        health_unit_id: HealthUnitId,
        basic: Option<&BasicDetailsUpdate>,
        workers: Option<&[WorkerUpdate]>,
        contacts: Option<&[ContactUpdate]>,
    ) -> Result<Self, StagePayloadError> {
        if basic.is_none() && workers.is_none() && contacts.is_none() {
            return Err(StagePayloadError::Validation(ValidationError::EmptyUpdate));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            health_unit_id,
            basic: basic.map(serde_json::to_string).transpose()?,
            workers: workers.map(serde_json::to_string).transpose()?,
            contacts: contacts.map(serde_json::to_string).transpose()?,
            is_approved: false,
            is_rejected: false,
            audit: AuditFields::new(),
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.basic.is_none() && self.workers.is_none() && self.contacts.is_none() {
            return Err(ValidationError::EmptyUpdate);
        }
        Ok(())
    }

    pub fn is_resolved(&self) -> bool {
        self.is_approved || self.is_rejected
    }

    pub fn basic_details(&self) -> serde_json::Result<Option<BasicDetailsUpdate>> {
        self.basic.as_deref().map(serde_json::from_str).transpose()
    }

    pub fn worker_updates(&self) -> serde_json::Result<Vec<WorkerUpdate>> {
        match self.workers.as_deref() {
            Some(text) => serde_json::from_str(text),
            None => Ok(Vec::new()),
        }
    }

    pub fn contact_updates(&self) -> serde_json::Result<Vec<ContactUpdate>> {
        match self.contacts.as_deref() {
            Some(text) => serde_json::from_str(text),
            None => Ok(Vec::new()),
        }
    }
}

/// Failure while building a buffer from typed payloads.
#[derive(Debug, thiserror::Error)]
pub enum StagePayloadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to serialize update payload: {0}")]
    Serialize(#[from] serde_json::Error),
}
