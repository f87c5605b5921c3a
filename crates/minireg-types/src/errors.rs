/// Unified error type for the minireg registration service.
///
/// All crates use this error type for propagation across crate boundaries.
/// Internal module errors should be converted into the appropriate variant.
#[derive(Debug, thiserror::Error)]
pub enum MiniregError {
    /// Malformed phone number. Recovered locally; the lookup step is never
    /// attempted for inputs that produce this error.
    #[error("validation error: {0}")]
    Validation(String),

    /// The record store is unreachable, the query failed, or the lookup
    /// timed out. Surfaced to the end user only as the generic transient
    /// status, never as "registered" or "not registered".
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A best-effort linkage write failed. Never alters the already-computed
    /// status; reported to the operator log only.
    #[error("linkage write failed: {0}")]
    LinkageWrite(String),

    /// Error from the caller-identity bridge (init data parsing, signature
    /// verification). Identity absence is not an error — it resolves to `None`.
    #[error("identity error: {0}")]
    Identity(String),

    /// A submission was rejected because one is already in flight for the
    /// same form instance.
    #[error("submission already in flight")]
    Busy,

    /// Error from configuration loading or validation.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Generic internal error for unexpected conditions.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for MiniregError {
    fn from(err: serde_json::Error) -> Self {
        MiniregError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for MiniregError {
    fn from(err: serde_yaml::Error) -> Self {
        MiniregError::Serialization(err.to_string())
    }
}
