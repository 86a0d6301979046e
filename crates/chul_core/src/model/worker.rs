//! Community health worker model.

use crate::model::audit::AuditFields;
use crate::model::health_unit::HealthUnitId;
use crate::model::validation::{require_not_blank, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type WorkerId = Uuid;

/// A person in charge of part of a unit's community area.
///
/// Whether the worker is still serving is carried by `audit.active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityHealthWorker {
    pub id: WorkerId,
    pub first_name: String,
    pub last_name: Option<String>,
    /// National id; unique within one health unit when present.
    pub id_number: Option<u32>,
    pub is_incharge: bool,
    pub health_unit_id: HealthUnitId,
    pub audit: AuditFields,
}

impl CommunityHealthWorker {
    pub fn new(health_unit_id: HealthUnitId, first_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.into(),
            last_name: None,
            id_number: None,
            is_incharge: false,
            health_unit_id,
            audit: AuditFields::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_not_blank("first_name", &self.first_name)
    }

    /// Full display name.
    pub fn name(&self) -> String {
        format!(
            "{} {}",
            self.first_name,
            self.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    }
}
