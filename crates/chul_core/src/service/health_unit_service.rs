//! Community health unit use-case service.
//!
//! # Responsibility
//! - Provide the save cycle (insert-or-update) for units.
//! - Drive approval workflow transitions through the validated update path.
//!
//! # Invariants
//! - Workflow transitions never clear the opposite flag; an approve after a
//!   reject (or vice versa) fails mutual-exclusion validation.
//! - Service APIs never bypass repository validation/persistence contracts.

use crate::model::health_unit::{ChuContactView, CommunityHealthUnit, HealthUnitId};
use crate::repo::health_unit_repo::{HealthUnitListQuery, HealthUnitRepository};
use crate::repo::revision::ENTITY_HEALTH_UNIT;
use crate::repo::{RepoError, RepoResult};
use log::{info, warn};

/// Use-case service wrapper for community health units.
pub struct HealthUnitService<R: HealthUnitRepository> {
    repo: R,
}

impl<R: HealthUnitRepository> HealthUnitService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Inserts the unit when it was never persisted, otherwise updates it.
    ///
    /// On first save `unit.code` is filled from the unit sequence.
    pub fn save(&self, unit: &mut CommunityHealthUnit) -> RepoResult<HealthUnitId> {
        let result = if self.repo.get_unit(unit.id, true)?.is_some() {
            self.repo.update_unit(unit).map(|()| unit.id)
        } else {
            self.repo.create_unit(unit)
        };

        if let Err(err) = &result {
            warn!(
                "event=chu_save module=service status=error unit_id={} field={} error={}",
                unit.id,
                err.validation_field().unwrap_or("-"),
                err
            );
        }
        result
    }

    pub fn get(&self, id: HealthUnitId) -> RepoResult<Option<CommunityHealthUnit>> {
        self.repo.get_unit(id, false)
    }

    pub fn list(&self, query: &HealthUnitListQuery) -> RepoResult<Vec<CommunityHealthUnit>> {
        self.repo.list_units(query)
    }

    pub fn soft_delete(&self, id: HealthUnitId) -> RepoResult<()> {
        self.repo.soft_delete_unit(id)
    }

    /// Sets `is_approved`, `approval_date` and `approval_comment`.
    pub fn approve(
        &self,
        id: HealthUnitId,
        comment: Option<String>,
    ) -> RepoResult<CommunityHealthUnit> {
        self.transition(id, "approve", |unit| unit.approve(comment))
    }

    /// Sets `is_rejected` and `rejection_reason`.
    pub fn reject(
        &self,
        id: HealthUnitId,
        reason: Option<String>,
    ) -> RepoResult<CommunityHealthUnit> {
        self.transition(id, "reject", |unit| unit.reject(reason))
    }

    /// Sets `is_closed` and `closing_comment`.
    pub fn close(
        &self,
        id: HealthUnitId,
        comment: Option<String>,
    ) -> RepoResult<CommunityHealthUnit> {
        self.transition(id, "close", |unit| unit.close(comment))
    }

    /// Contacts linked to a live unit.
    pub fn contacts(&self, id: HealthUnitId) -> RepoResult<Vec<ChuContactView>> {
        self.require_unit(id)?;
        self.repo.list_contacts(id)
    }

    /// Mean rating of a live unit; `0.0` when unrated.
    pub fn average_rating(&self, id: HealthUnitId) -> RepoResult<f64> {
        self.require_unit(id)?;
        self.repo.average_rating(id)
    }

    fn transition(
        &self,
        id: HealthUnitId,
        action: &'static str,
        apply: impl FnOnce(&mut CommunityHealthUnit),
    ) -> RepoResult<CommunityHealthUnit> {
        let mut unit = self.require_unit(id)?;
        apply(&mut unit);

        match self.repo.update_unit(&mut unit) {
            Ok(()) => {
                info!("event=chu_{action} module=service status=ok unit_id={id}");
                Ok(unit)
            }
            Err(err) => {
                warn!(
                    "event=chu_{action} module=service status=error unit_id={id} error={err}"
                );
                Err(err)
            }
        }
    }

    fn require_unit(&self, id: HealthUnitId) -> RepoResult<CommunityHealthUnit> {
        self.repo
            .get_unit(id, false)?
            .ok_or(RepoError::not_found(ENTITY_HEALTH_UNIT, id))
    }
}
