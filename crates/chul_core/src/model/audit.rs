//! Audit columns shared by every persisted record.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Returns the current wall clock as epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Lifecycle metadata embedded into every entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFields {
    /// Epoch ms of the insert.
    pub created_at: i64,
    /// Epoch ms of the last persisted mutation.
    pub updated_at: i64,
    /// Business-level "still in service" flag; independent of deletion.
    pub active: bool,
    /// Soft delete tombstone. `Some` rows are hidden from default reads.
    pub deleted_at: Option<i64>,
}

impl AuditFields {
    pub fn new() -> Self {
        let now = now_epoch_ms();
        Self {
            created_at: now,
            updated_at: now,
            active: true,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = now_epoch_ms().max(self.created_at);
    }
}

impl Default for AuditFields {
    fn default() -> Self {
        Self::new()
    }
}
