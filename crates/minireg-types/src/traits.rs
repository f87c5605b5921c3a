/// Trait contracts for the minireg external collaborators.
///
/// The workflow core codes against these interfaces, not against concrete
/// backends. Both traits are defined here in `minireg-types` so that every
/// crate can depend on them without circular dependencies. The store handle
/// is constructed once at bootstrap and passed in explicitly — there is no
/// ambient, lazily-initialized global.
use async_trait::async_trait;

use crate::errors::MiniregError;
use crate::records::{CallerId, RecordId, RegistrationRecord};

// ============================================================
// Record Store Trait
// ============================================================

/// The external record store holding registration entries.
///
/// Treated as a capability: given a phone number, return matching records.
/// Implementations must never mutate anything beyond the `telegram_id`
/// field of a record.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Return all records whose phone-number field equals `phone` exactly
    /// (case-sensitive, no partial match), in a stable order.
    ///
    /// The field is not uniquely constrained; zero or more records may
    /// match. Connection and query failures surface as
    /// [`MiniregError::StoreUnavailable`].
    async fn find_by_phone(&self, phone: &str)
        -> Result<Vec<RegistrationRecord>, MiniregError>;

    /// Attach a caller identity to a record, if and only if the record does
    /// not already carry one.
    ///
    /// A record with an existing non-empty identity is left untouched and
    /// the call succeeds as a no-op. Failures surface as
    /// [`MiniregError::LinkageWrite`] and are non-fatal to the workflow.
    async fn link_caller(&self, id: &RecordId, caller: &CallerId) -> Result<(), MiniregError>;
}

// ============================================================
// Identity Bridge Trait
// ============================================================

/// Bridge to the chat platform supplying the caller's identity token.
///
/// Resolution is synchronous and best-effort: when the platform context is
/// missing, malformed, or fails verification, implementations return `None`
/// and log a warning — never an error. Identity absence must not block the
/// lookup.
pub trait IdentityBridge: Send + Sync {
    /// Resolve a caller identity from the platform-supplied payload
    /// (for Telegram, the Mini App `initData` string).
    fn resolve(&self, payload: &str) -> Option<CallerId>;
}
