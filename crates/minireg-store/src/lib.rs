/// PostgreSQL-backed record store for the minireg registration service.
///
/// Implements the [`minireg_types::RegistrationStore`] trait contract:
/// - Exact-match phone-number lookup over the `registrations` table
/// - Best-effort caller linkage that never overwrites an existing identity
pub mod postgres;

pub use postgres::PgRegistrationStore;
