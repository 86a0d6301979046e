//! Registry domain model for community health units.
//!
//! # Responsibility
//! - Define canonical records for units, workers, contacts, ratings and buffers.
//! - Keep cross-field invariants next to the data they guard.
//!
//! # Invariants
//! - Every record embeds [`audit::AuditFields`] instead of inheriting a base type.
//! - Deletion is represented by `deleted_at` tombstones, not hard delete.

pub mod audit;
pub mod catalog;
pub mod health_unit;
pub mod rating;
pub mod registry;
pub mod update_buffer;
pub mod validation;
pub mod worker;
