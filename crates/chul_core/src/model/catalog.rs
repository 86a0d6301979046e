//! Small catalog records: unit operation statuses and CHU services.

use crate::model::audit::AuditFields;
use crate::model::validation::{require_not_blank, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type StatusId = Uuid;
pub type ChuServiceId = Uuid;

/// Operation status of a community health unit,
/// e.g. fully-functional, semi-functional, non-functional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: StatusId,
    pub name: String,
    pub description: Option<String>,
    pub audit: AuditFields,
}

impl Status {
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

/// A service offered by community units. Independent of any unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChuService {
    pub id: ChuServiceId,
    pub name: String,
    pub description: Option<String>,
    pub audit: AuditFields,
}

impl ChuService {
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

#[cfg(test)]
mod tests {
    use super::{ChuService, Status};

    #[test]
    fn status_requires_name() {
        let err = Status::new("  ").validate().unwrap_err();
        assert_eq!(err.field(), "name");
        assert!(Status::new("fully-functional").validate().is_ok());
    }

    #[test]
    fn service_requires_name() {
        assert!(ChuService::new("").validate().is_err());
    }
}
