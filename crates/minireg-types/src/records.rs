/// Shared data types used across all minireg subsystems.
///
/// These types are the lingua franca of the workflow — every crate imports
/// from here. The registration record mirrors the store schema; the
/// submission types are ephemeral, created per form submit.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference to a registration record in the store.
pub type RecordId = Uuid;

// ============================================================
// Caller Identity
// ============================================================

/// Opaque identity token for the current chat-platform user.
///
/// Obtained once per session from the identity bridge; used to link a
/// registration record to a specific chat account. May be absent for the
/// whole session if the platform context is missing or fails verification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerId(pub String);

impl CallerId {
    /// The token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for CallerId {
    fn from(id: i64) -> Self {
        CallerId(id.to_string())
    }
}

// ============================================================
// Registration Records
// ============================================================

/// A registration record as stored in the record store.
///
/// `phone_number` is the lookup key. It is not uniquely constrained — a
/// lookup may return multiple matching records and the workflow iterates
/// all of them. All fields other than `telegram_id` are never mutated by
/// this service; unknown columns ride along in `metadata` untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRecord {
    /// Surrogate key, used as the record reference for linkage updates.
    pub id: RecordId,
    /// Normalized digit string the lookup matches against, exactly.
    pub phone_number: String,
    /// Identity token of the chat-platform user linked to this record.
    /// `None` until the first successful linkage; never overwritten once set.
    pub telegram_id: Option<CallerId>,
    /// All other record fields, opaque to this service.
    pub metadata: serde_json::Value,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl RegistrationRecord {
    /// Whether this record still lacks a linked caller identity.
    pub fn is_unlinked(&self) -> bool {
        match &self.telegram_id {
            None => true,
            Some(id) => id.as_str().is_empty(),
        }
    }
}

// ============================================================
// Submission Types
// ============================================================

/// Raw form input, created per submit and discarded after processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionInput {
    /// Raw user input; must pass validation before it reaches the lookup.
    pub phone_number: String,
}

/// Which validation rule a rejected phone number failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationFailure {
    /// Input is not exactly 10 characters long.
    Length,
    /// Input is 10 characters but does not start with 07 or 09, or
    /// contains a non-digit.
    Format,
}

impl ValidationFailure {
    /// The fixed field-level message for this failure.
    pub fn message(&self) -> &'static str {
        match self {
            ValidationFailure::Length => "Phone number must be exactly 10 characters long.",
            ValidationFailure::Format => {
                "Invalid phone number format. It must start with 07 or 09 and contain only numbers."
            }
        }
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of one submission. Exactly one status is produced per submit.
///
/// This is a closed set: every user-visible message is selected from fixed
/// templates keyed by these variants, with no user-controlled interpolation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    /// At least one record matched the submitted phone number.
    AlreadyRegistered,
    /// No record matched; the message carries the fixed fallback contact.
    NotRegistered,
    /// Validation rejected the input; the lookup was not attempted.
    Invalid(ValidationFailure),
    /// The store was unreachable or the lookup timed out. Deliberately
    /// claims neither "registered" nor "not registered".
    TransientError,
}
