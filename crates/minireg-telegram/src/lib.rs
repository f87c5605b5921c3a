/// Telegram caller-identity bridge for the minireg registration service.
///
/// Implements the [`minireg_types::IdentityBridge`] trait contract over
/// Mini App `initData`: signature verification, freshness check, and
/// user-id extraction.
pub mod init_data;

pub use init_data::TelegramIdentityBridge;
