//! Service rating of a community health unit.

use crate::model::audit::AuditFields;
use crate::model::health_unit::HealthUnitId;
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RatingId = Uuid;

pub const MIN_RATING: u32 = 0;
pub const MAX_RATING: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChuRating {
    pub id: RatingId,
    pub health_unit_id: HealthUnitId,
    /// Inclusive range `MIN_RATING..=MAX_RATING`.
    pub rating: u32,
    pub comment: Option<String>,
    pub audit: AuditFields,
}

impl ChuRating {
    pub fn new(health_unit_id: HealthUnitId, rating: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            health_unit_id,
            rating,
            comment: None,
            audit: AuditFields::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(ValidationError::RatingOutOfRange(self.rating));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ChuRating;
    use crate::model::validation::ValidationError;
    use uuid::Uuid;

    #[test]
    fn bounds_are_inclusive() {
        let unit = Uuid::new_v4();
        assert!(ChuRating::new(unit, 0).validate().is_ok());
        assert!(ChuRating::new(unit, 5).validate().is_ok());
        assert_eq!(
            ChuRating::new(unit, 6).validate().unwrap_err(),
            ValidationError::RatingOutOfRange(6)
        );
    }
}
