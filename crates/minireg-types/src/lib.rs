/// Shared types, traits, and errors for the minireg registration service.
///
/// This crate is the foundation that all other minireg crates depend on.
/// It contains:
/// - **Trait contracts** (`traits`) that define the seams to external collaborators
/// - **Shared data types** (`records`) used across all subsystems
/// - **Error types** (`errors`) for unified error handling
/// - **Config types** (`config`) and the config loader (`config_loader`)
pub mod config;
pub mod config_loader;
pub mod errors;
pub mod records;
pub mod traits;

// Re-export commonly used types at the crate root for convenience.
pub use config::*;
pub use errors::MiniregError;
pub use records::*;
pub use traits::*;
