//! Field-scoped validation failures raised before persistence.

use thiserror::Error;

/// Validation failure attached to the offending attribute.
///
/// [`ValidationError::field`] returns the attribute key a caller should attach
/// the message to when re-presenting the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("A Community Unit cannot be attached to a closed facility")]
    FacilityClosed,
    #[error("A Community Unit cannot be approved and rejected at the same time")]
    ApprovedAndRejected,
    #[error("{field} must not be blank")]
    Blank { field: &'static str },
    #[error("rating must be between 0 and 5, got {0}")]
    RatingOutOfRange(u32),
    #[error("code {persisted} is already assigned and cannot change to {requested}")]
    CodeReassigned { persisted: i64, requested: i64 },
    #[error("at least one of basic details, workers or contacts must be updated")]
    EmptyUpdate,
}

impl ValidationError {
    /// Attribute key the error belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::FacilityClosed => "facility",
            Self::ApprovedAndRejected => "approve/reject",
            Self::Blank { field } => *field,
            Self::RatingOutOfRange(_) => "rating",
            Self::CodeReassigned { .. } => "code",
            Self::EmptyUpdate => "updates",
        }
    }
}

pub(crate) fn require_not_blank(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank { field });
    }
    Ok(())
}
