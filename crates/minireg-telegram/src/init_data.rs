//! Telegram Mini App init data verification.
//!
//! Resolves the caller's identity from the `initData` string a Mini App
//! front-end receives from Telegram:
//! - HMAC-SHA256 signature verification against the bot token
//!   (secret key = HMAC-SHA256("WebAppData", bot_token))
//! - `auth_date` freshness window
//! - `user.id` extraction from the signed user payload
//!
//! Resolution is best-effort: any missing, stale, or unverifiable payload
//! yields `None` with an operator-facing warning. The lookup workflow
//! proceeds without an identity; only linkage is skipped.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::warn;

use minireg_types::config::TelegramConfig;
use minireg_types::errors::MiniregError;
use minireg_types::records::CallerId;
use minireg_types::traits::IdentityBridge;

type HmacSha256 = Hmac<Sha256>;

/// Key for deriving the init data secret from the bot token.
const WEBAPP_DATA_KEY: &[u8] = b"WebAppData";

/// The signed user object embedded in init data.
///
/// Only the id is used; the remaining fields Telegram includes
/// (names, language, premium flags) are ignored.
#[derive(Debug, Deserialize)]
struct InitDataUser {
    id: i64,
}

/// Identity bridge backed by Telegram Mini App init data.
pub struct TelegramIdentityBridge {
    bot_token: Option<String>,
    auth_max_age_secs: u64,
}

impl TelegramIdentityBridge {
    /// Create a bridge from the Telegram section of the service config.
    ///
    /// A missing bot token is tolerated: the bridge then resolves nothing,
    /// warning once at construction and once per resolution attempt.
    pub fn new(config: &TelegramConfig) -> Self {
        if config.bot_token.is_none() {
            warn!("telegram bot token not configured; caller identities will not resolve");
        }
        Self {
            bot_token: config.bot_token.clone(),
            auth_max_age_secs: config.auth_max_age_secs,
        }
    }

    /// Verify a raw init data payload and extract the signed user.
    fn verify(&self, payload: &str) -> Result<InitDataUser, MiniregError> {
        let token = self
            .bot_token
            .as_deref()
            .ok_or_else(|| MiniregError::Identity("bot token not configured".to_string()))?;

        let pairs = parse_pairs(payload);
        let hash = pairs
            .iter()
            .find(|(k, _)| k == "hash")
            .map(|(_, v)| v.clone())
            .ok_or_else(|| MiniregError::Identity("init data has no hash field".to_string()))?;
        let expected = hex::decode(&hash)
            .map_err(|_| MiniregError::Identity("init data hash is not hex".to_string()))?;

        let check_string = data_check_string(&pairs);
        let secret = HmacSha256::new_from_slice(WEBAPP_DATA_KEY)
            .map_err(|e| MiniregError::Identity(e.to_string()))?
            .chain_update(token.as_bytes())
            .finalize()
            .into_bytes();
        let mut mac = HmacSha256::new_from_slice(&secret)
            .map_err(|e| MiniregError::Identity(e.to_string()))?;
        mac.update(check_string.as_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| MiniregError::Identity("init data signature mismatch".to_string()))?;

        self.check_freshness(&pairs)?;

        let user_json = pairs
            .iter()
            .find(|(k, _)| k == "user")
            .map(|(_, v)| v.clone())
            .ok_or_else(|| MiniregError::Identity("init data has no user field".to_string()))?;
        let user: InitDataUser = serde_json::from_str(&user_json)
            .map_err(|e| MiniregError::Identity(format!("init data user is malformed: {e}")))?;
        Ok(user)
    }

    /// Reject payloads whose `auth_date` is older than the configured window.
    ///
    /// A future-dated payload (clock skew) passes; only staleness is rejected.
    fn check_freshness(&self, pairs: &[(String, String)]) -> Result<(), MiniregError> {
        let auth_date = pairs
            .iter()
            .find(|(k, _)| k == "auth_date")
            .and_then(|(_, v)| v.parse::<i64>().ok())
            .ok_or_else(|| {
                MiniregError::Identity("init data has no valid auth_date".to_string())
            })?;

        let age = Utc::now().timestamp() - auth_date;
        if age > self.auth_max_age_secs as i64 {
            return Err(MiniregError::Identity(format!(
                "init data is stale ({age}s old)"
            )));
        }
        Ok(())
    }
}

impl IdentityBridge for TelegramIdentityBridge {
    fn resolve(&self, payload: &str) -> Option<CallerId> {
        if payload.is_empty() {
            warn!("telegram init data missing; proceeding without caller identity");
            return None;
        }
        match self.verify(payload) {
            Ok(user) => Some(CallerId::from(user.id)),
            Err(e) => {
                warn!(error = %e, "telegram init data rejected; proceeding without caller identity");
                None
            }
        }
    }
}

/// Decode the init data query string into key/value pairs.
fn parse_pairs(payload: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(payload.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Build the data-check-string: all fields except `hash`, sorted by key,
/// joined as `key=value` lines.
fn data_check_string(pairs: &[(String, String)]) -> String {
    let mut fields: Vec<&(String, String)> =
        pairs.iter().filter(|(k, _)| k != "hash").collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}
