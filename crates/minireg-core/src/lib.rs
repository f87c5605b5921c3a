/// Submission workflow for the minireg registration service.
///
/// Drives one registration lookup per form submit:
/// - **Validation** (`validation`) — fixed-shape phone number check
/// - **Status templates** (`status`) — the closed set of user-visible messages
/// - **Submission handler** (`submission`) — lookup, best-effort linkage,
///   status resolution, and the per-form busy guard
pub mod status;
pub mod submission;
pub mod validation;

pub use submission::SubmissionHandler;
pub use validation::PhoneValidator;
