//! Pending-update buffer workflow.
//!
//! # Responsibility
//! - Stage proposed unit edits for later review.
//! - Merge an approved buffer into its unit in one transaction.
//!
//! # Merge semantics
//! - Basic details: patch, only provided fields change.
//! - Workers: upsert. Entries with `id` update that worker of the same unit,
//!   entries without `id` are created. Unmentioned workers stay as they are.
//! - Contacts: append. A contact with the same type and value already linked
//!   to the unit is skipped.
//!
//! # Invariants
//! - The merged unit passes the same validation as a direct save.
//! - A buffer is applied or rejected at most once.

use crate::model::health_unit::{CommunityHealthUnit, HealthUnitId};
use crate::model::registry::Contact;
use crate::model::update_buffer::{
    BasicDetailsUpdate, BufferId, ChuUpdateBuffer, ContactUpdate, StagePayloadError, WorkerUpdate,
};
use crate::model::worker::CommunityHealthWorker;
use crate::repo::buffer_repo::{self, BufferResolution};
use crate::repo::health_unit_repo::{link_contact_in, list_contacts_in, load_unit, update_unit_in};
use crate::repo::registry_repo::insert_contact;
use crate::repo::revision::{ENTITY_HEALTH_UNIT, ENTITY_UPDATE_BUFFER, ENTITY_WORKER};
use crate::repo::worker_repo::{insert_worker, load_worker, update_worker_in};
use crate::repo::RepoError;
use log::{info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use thiserror::Error;

pub type BufferResult<T> = Result<T, BufferError>;

#[derive(Debug, Error)]
pub enum BufferError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("invalid update payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("update buffer {0} is already resolved")]
    AlreadyResolved(BufferId),
}

impl BufferError {
    /// Returns the field key when this is a validation failure.
    pub fn validation_field(&self) -> Option<&'static str> {
        match self {
            Self::Repo(err) => err.validation_field(),
            _ => None,
        }
    }
}

impl From<StagePayloadError> for BufferError {
    fn from(value: StagePayloadError) -> Self {
        match value {
            StagePayloadError::Validation(err) => Self::Repo(RepoError::Validation(err)),
            StagePayloadError::Serialize(err) => Self::Payload(err),
        }
    }
}

impl From<rusqlite::Error> for BufferError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// Outcome counters of one applied buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub buffer_id: BufferId,
    pub health_unit_id: HealthUnitId,
    pub basic_updated: bool,
    pub workers_created: usize,
    pub workers_updated: usize,
    pub contacts_added: usize,
    pub contacts_skipped: usize,
}

/// Service for staging, applying and rejecting unit update buffers.
pub struct UpdateBufferService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> UpdateBufferService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Stages edits for a live unit and returns the new buffer id.
    ///
    /// # Errors
    /// - Validation `EmptyUpdate` when all payloads are `None`.
    /// - `NotFound` when the unit does not exist.
    pub fn stage(
        &self,
        unit_id: HealthUnitId,
        basic: Option<&BasicDetailsUpdate>,
        workers: Option<&[WorkerUpdate]>,
        contacts: Option<&[ContactUpdate]>,
    ) -> BufferResult<BufferId> {
        let buffer = ChuUpdateBuffer::stage(unit_id, basic, workers, contacts)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        buffer_repo::insert_buffer(&tx, &buffer)?;
        tx.commit()?;

        info!(
            "event=chu_buffer_stage module=service status=ok buffer_id={} unit_id={} basic={} workers={} contacts={}",
            buffer.id,
            unit_id,
            buffer.basic.is_some(),
            buffer.workers.is_some(),
            buffer.contacts.is_some()
        );
        Ok(buffer.id)
    }

    pub fn get(&self, id: BufferId) -> BufferResult<Option<ChuUpdateBuffer>> {
        Ok(buffer_repo::load_buffer(self.conn, id)?)
    }

    /// Buffers of a unit still waiting for review.
    pub fn pending_for_unit(&self, unit_id: HealthUnitId) -> BufferResult<Vec<ChuUpdateBuffer>> {
        Ok(buffer_repo::list_pending(self.conn, unit_id)?)
    }

    /// Merges a pending buffer into its unit and marks it approved.
    ///
    /// # Errors
    /// - `NotFound` when the buffer, its unit, or a referenced worker is gone.
    /// - `AlreadyResolved` when the buffer was applied or rejected before.
    /// - Validation errors from the merged unit or workers.
    pub fn apply(&self, id: BufferId) -> BufferResult<ApplySummary> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let result = apply_in(&tx, id);
        match result {
            Ok(summary) => {
                tx.commit()?;
                info!(
                    "event=chu_buffer_apply module=service status=ok buffer_id={} unit_id={} workers_created={} workers_updated={} contacts_added={}",
                    id,
                    summary.health_unit_id,
                    summary.workers_created,
                    summary.workers_updated,
                    summary.contacts_added
                );
                Ok(summary)
            }
            Err(err) => {
                warn!("event=chu_buffer_apply module=service status=error buffer_id={id} error={err}");
                Err(err)
            }
        }
    }

    /// Marks a pending buffer rejected; the unit is left untouched.
    pub fn reject(&self, id: BufferId) -> BufferResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let buffer = buffer_repo::load_buffer(&tx, id)?
            .ok_or(RepoError::not_found(ENTITY_UPDATE_BUFFER, id))?;
        if buffer.is_resolved() {
            return Err(BufferError::AlreadyResolved(id));
        }
        buffer_repo::mark_resolved(&tx, id, BufferResolution::Rejected)?;
        tx.commit()?;

        info!("event=chu_buffer_reject module=service status=ok buffer_id={id}");
        Ok(())
    }
}

fn apply_in(conn: &Connection, id: BufferId) -> BufferResult<ApplySummary> {
    let buffer =
        buffer_repo::load_buffer(conn, id)?.ok_or(RepoError::not_found(ENTITY_UPDATE_BUFFER, id))?;
    if buffer.is_resolved() {
        return Err(BufferError::AlreadyResolved(id));
    }

    let mut unit = load_unit(conn, buffer.health_unit_id, false)?
        .ok_or(RepoError::not_found(ENTITY_HEALTH_UNIT, buffer.health_unit_id))?;

    let basic = buffer.basic_details()?;
    let workers = buffer.worker_updates()?;
    let contacts = buffer.contact_updates()?;

    let mut summary = ApplySummary {
        buffer_id: id,
        health_unit_id: unit.id,
        basic_updated: basic.is_some(),
        ..ApplySummary::default()
    };

    if let Some(basic) = &basic {
        patch_basic_details(&mut unit, basic);
    }
    update_unit_in(conn, &unit)?;

    for update in &workers {
        match update.id {
            Some(worker_id) => {
                let mut worker = load_worker(conn, worker_id, false)?
                    .filter(|worker| worker.health_unit_id == unit.id)
                    .ok_or(RepoError::not_found(ENTITY_WORKER, worker_id))?;
                worker.first_name = update.first_name.clone();
                worker.last_name = update.last_name.clone();
                worker.id_number = update.id_number;
                worker.is_incharge = update.is_incharge;
                update_worker_in(conn, &worker)?;
                summary.workers_updated += 1;
            }
            None => {
                let mut worker = CommunityHealthWorker::new(unit.id, update.first_name.clone());
                worker.last_name = update.last_name.clone();
                worker.id_number = update.id_number;
                worker.is_incharge = update.is_incharge;
                insert_worker(conn, &worker)?;
                summary.workers_created += 1;
            }
        }
    }

    let mut linked = list_contacts_in(conn, unit.id)?
        .into_iter()
        .map(|view| (view.contact_type, view.contact))
        .collect::<Vec<_>>();
    for update in &contacts {
        let value = update.contact.trim();
        let duplicate = linked
            .iter()
            .any(|(contact_type, contact)| *contact_type == update.contact_type_id && contact == value);
        if duplicate {
            summary.contacts_skipped += 1;
            continue;
        }

        let contact = Contact::new(update.contact_type_id, value);
        insert_contact(conn, &contact)?;
        link_contact_in(conn, unit.id, contact.id)?;
        linked.push((contact.contact_type_id, contact.contact));
        summary.contacts_added += 1;
    }

    buffer_repo::mark_resolved(conn, id, BufferResolution::Approved)?;
    Ok(summary)
}

fn patch_basic_details(unit: &mut CommunityHealthUnit, basic: &BasicDetailsUpdate) {
    if let Some(name) = &basic.name {
        unit.name = name.clone();
    }
    if let Some(status_id) = basic.status_id {
        unit.status_id = status_id;
    }
    if let Some(households) = basic.households_monitored {
        unit.households_monitored = households;
    }
    if let Some(date) = basic.date_established {
        unit.date_established = date;
    }
    if let Some(date) = basic.date_operational {
        unit.date_operational = Some(date);
    }
    if let Some(location) = &basic.location {
        unit.location = Some(location.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::patch_basic_details;
    use crate::model::health_unit::CommunityHealthUnit;
    use crate::model::update_buffer::BasicDetailsUpdate;
    use uuid::Uuid;

    #[test]
    fn patch_only_touches_provided_fields() {
        let mut unit = CommunityHealthUnit::new("Old name", Uuid::new_v4(), Uuid::new_v4());
        unit.location = Some("Ridge".to_string());
        let status_before = unit.status_id;

        patch_basic_details(
            &mut unit,
            &BasicDetailsUpdate {
                name: Some("New name".to_string()),
                households_monitored: Some(75),
                ..BasicDetailsUpdate::default()
            },
        );

        assert_eq!(unit.name, "New name");
        assert_eq!(unit.households_monitored, 75);
        assert_eq!(unit.location.as_deref(), Some("Ridge"));
        assert_eq!(unit.status_id, status_before);
    }
}
