//! HTTP adapter for the minireg registration service.
//!
//! Exposes the submission handler to the Mini App front-end:
//! - `POST /api/registration/check` — one registration lookup per call
//! - `GET /healthz` — liveness probe
//!
//! Every accepted submission returns HTTP 200 with one of the four fixed
//! statuses; the busy guard maps to HTTP 429. The store handle and the
//! identity bridge are injected at construction, never captured from
//! ambient state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::error;

use minireg_core::status::message_lines;
use minireg_core::SubmissionHandler;
use minireg_types::errors::MiniregError;
use minireg_types::records::{CallerId, SubmissionInput, SubmissionStatus};
use minireg_types::traits::{IdentityBridge, RegistrationStore};

/// Upper bound on tracked form sessions before idle ones are pruned.
const MAX_SESSIONS: usize = 10_000;

/// Header carrying an explicit form-instance key for clients without a
/// verifiable Telegram identity.
const CLIENT_SESSION_HEADER: &str = "x-client-session";

// ============================================================
// Application State
// ============================================================

/// Shared state for the HTTP adapter.
///
/// One [`SubmissionHandler`] is kept per form session so the per-form
/// busy guard holds across requests from the same client.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn RegistrationStore>,
    bridge: Arc<dyn IdentityBridge>,
    lookup_timeout: Duration,
    sessions: Arc<Mutex<HashMap<String, Arc<SubmissionHandler>>>>,
}

impl AppState {
    /// Create adapter state around injected collaborators.
    pub fn new(
        store: Arc<dyn RegistrationStore>,
        bridge: Arc<dyn IdentityBridge>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            store,
            bridge,
            lookup_timeout,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get or create the submission handler for a form session.
    ///
    /// When the registry is full, sessions with no submission in flight
    /// are pruned first; busy handlers are never evicted.
    pub async fn handler_for(&self, session_key: &str) -> Arc<SubmissionHandler> {
        let mut sessions = self.sessions.lock().await;
        if !sessions.contains_key(session_key) && sessions.len() >= MAX_SESSIONS {
            sessions.retain(|_, handler| handler.is_busy());
        }
        Arc::clone(sessions.entry(session_key.to_string()).or_insert_with(|| {
            Arc::new(SubmissionHandler::new(
                Arc::clone(&self.store),
                self.lookup_timeout,
            ))
        }))
    }

    /// A one-shot handler for requests that carry no session key at all.
    fn ephemeral_handler(&self) -> Arc<SubmissionHandler> {
        Arc::new(SubmissionHandler::new(
            Arc::clone(&self.store),
            self.lookup_timeout,
        ))
    }
}

// ============================================================
// Wire Types
// ============================================================

/// Request body for the check endpoint.
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    /// Raw phone number from the form field.
    pub phone_number: String,
    /// Telegram Mini App init data, when running inside Telegram.
    #[serde(default)]
    pub init_data: Option<String>,
}

/// Response body for an accepted submission.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
    /// Machine-readable status tag.
    pub status: String,
    /// The fixed message lines for this status, in display order.
    pub message_lines: Vec<String>,
}

/// Response body for a rejected request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn status_tag(status: &SubmissionStatus) -> &'static str {
    match status {
        SubmissionStatus::AlreadyRegistered => "already_registered",
        SubmissionStatus::NotRegistered => "not_registered",
        SubmissionStatus::Invalid(_) => "invalid",
        SubmissionStatus::TransientError => "transient_error",
    }
}

// ============================================================
// Router & Handlers
// ============================================================

/// Build the adapter router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/registration/check", post(check_registration))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn check_registration(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CheckRequest>,
) -> Response {
    // Identity resolution is best-effort; the bridge logs the warning when
    // the payload is missing or unverifiable.
    let caller = state
        .bridge
        .resolve(request.init_data.as_deref().unwrap_or(""));

    let handler = match session_key(&caller, &headers) {
        Some(key) => state.handler_for(&key).await,
        None => state.ephemeral_handler(),
    };

    let input = SubmissionInput {
        phone_number: request.phone_number,
    };
    match handler.submit(&input, caller.as_ref()).await {
        Ok(status) => (
            StatusCode::OK,
            Json(CheckResponse {
                status: status_tag(&status).to_string(),
                message_lines: message_lines(&status),
            }),
        )
            .into_response(),
        Err(MiniregError::Busy) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse {
                error: "a submission is already in flight for this session".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "submission handler failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal error".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Derive the form-session key for a request.
///
/// A verified caller identity wins; otherwise an explicit client session
/// header is accepted (sanitized). Requests with neither get no key and
/// are processed unguarded.
fn session_key(caller: &Option<CallerId>, headers: &HeaderMap) -> Option<String> {
    if let Some(caller) = caller {
        return Some(format!("tg:{caller}"));
    }
    let value = headers.get(CLIENT_SESSION_HEADER)?.to_str().ok()?.trim();
    if value.is_empty()
        || value.len() > 64
        || !value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return None;
    }
    Some(format!("anon:{value}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use minireg_core::status::FALLBACK_CONTACT;
    use minireg_types::records::{RecordId, RegistrationRecord};
    use std::net::SocketAddr;
    use tokio::net::TcpListener;
    use tokio::sync::Notify;
    use uuid::Uuid;

    /// Start a test server and return its base URL.
    async fn start_test_server(state: AppState) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn make_record(phone: &str, telegram_id: Option<&str>) -> RegistrationRecord {
        RegistrationRecord {
            id: Uuid::new_v4(),
            phone_number: phone.to_string(),
            telegram_id: telegram_id.map(|id| CallerId(id.to_string())),
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
        }
    }

    struct StaticStore {
        records: Vec<RegistrationRecord>,
    }

    #[async_trait]
    impl RegistrationStore for StaticStore {
        async fn find_by_phone(
            &self,
            phone: &str,
        ) -> Result<Vec<RegistrationRecord>, MiniregError> {
            Ok(self
                .records
                .iter()
                .filter(|r| r.phone_number == phone)
                .cloned()
                .collect())
        }

        async fn link_caller(
            &self,
            _id: &RecordId,
            _caller: &CallerId,
        ) -> Result<(), MiniregError> {
            Ok(())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl RegistrationStore for FailingStore {
        async fn find_by_phone(
            &self,
            _phone: &str,
        ) -> Result<Vec<RegistrationRecord>, MiniregError> {
            Err(MiniregError::StoreUnavailable("down".to_string()))
        }

        async fn link_caller(
            &self,
            _id: &RecordId,
            _caller: &CallerId,
        ) -> Result<(), MiniregError> {
            Ok(())
        }
    }

    /// Store that signals lookup entry and blocks until released.
    struct GatedStore {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl RegistrationStore for GatedStore {
        async fn find_by_phone(
            &self,
            phone: &str,
        ) -> Result<Vec<RegistrationRecord>, MiniregError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(vec![make_record(phone, Some("linked"))])
        }

        async fn link_caller(
            &self,
            _id: &RecordId,
            _caller: &CallerId,
        ) -> Result<(), MiniregError> {
            Ok(())
        }
    }

    /// Bridge that resolves a fixed identity.
    struct FixedBridge(&'static str);

    impl IdentityBridge for FixedBridge {
        fn resolve(&self, _payload: &str) -> Option<CallerId> {
            Some(CallerId(self.0.to_string()))
        }
    }

    /// Bridge with no platform context.
    struct AbsentBridge;

    impl IdentityBridge for AbsentBridge {
        fn resolve(&self, _payload: &str) -> Option<CallerId> {
            None
        }
    }

    fn state_with(
        store: Arc<dyn RegistrationStore>,
        bridge: Arc<dyn IdentityBridge>,
    ) -> AppState {
        AppState::new(store, bridge, Duration::from_secs(5))
    }

    async fn post_check(
        base: &str,
        body: &serde_json::Value,
        session: Option<&str>,
    ) -> reqwest::Response {
        let client = reqwest::Client::new();
        let mut request = client
            .post(format!("{base}/api/registration/check"))
            .json(body);
        if let Some(session) = session {
            request = request.header(CLIENT_SESSION_HEADER, session);
        }
        request.send().await.unwrap()
    }

    #[tokio::test]
    async fn test_healthz() {
        let state = state_with(Arc::new(StaticStore { records: vec![] }), Arc::new(AbsentBridge));
        let base = start_test_server(state).await;

        let response = reqwest::get(format!("{base}/healthz")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_not_registered_includes_fallback_contact() {
        let state = state_with(Arc::new(StaticStore { records: vec![] }), Arc::new(AbsentBridge));
        let base = start_test_server(state).await;

        let response = post_check(&base, &serde_json::json!({"phone_number": "0912345678"}), None)
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: CheckResponse = response.json().await.unwrap();
        assert_eq!(body.status, "not_registered");
        assert!(body.message_lines[1].contains(FALLBACK_CONTACT));
    }

    #[tokio::test]
    async fn test_registered_phone_resolves_already_registered() {
        let state = state_with(
            Arc::new(StaticStore {
                records: vec![make_record("0912345678", None)],
            }),
            Arc::new(FixedBridge("12345")),
        );
        let base = start_test_server(state).await;

        let response = post_check(
            &base,
            &serde_json::json!({"phone_number": "0912345678", "init_data": "signed"}),
            None,
        )
        .await;
        let body: CheckResponse = response.json().await.unwrap();
        assert_eq!(body.status, "already_registered");
        assert_eq!(body.message_lines, vec!["You have already registered"]);
    }

    #[tokio::test]
    async fn test_invalid_phone_reports_field_level_message() {
        let state = state_with(Arc::new(StaticStore { records: vec![] }), Arc::new(AbsentBridge));
        let base = start_test_server(state).await;

        let response =
            post_check(&base, &serde_json::json!({"phone_number": "123"}), None).await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: CheckResponse = response.json().await.unwrap();
        assert_eq!(body.status, "invalid");
        assert_eq!(
            body.message_lines,
            vec!["Phone number must be exactly 10 characters long."]
        );
    }

    #[tokio::test]
    async fn test_store_failure_maps_to_transient_error() {
        let state = state_with(Arc::new(FailingStore), Arc::new(AbsentBridge));
        let base = start_test_server(state).await;

        let response = post_check(&base, &serde_json::json!({"phone_number": "0912345678"}), None)
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: CheckResponse = response.json().await.unwrap();
        assert_eq!(body.status, "transient_error");
    }

    #[tokio::test]
    async fn test_second_submit_in_same_session_rejected_while_busy() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let state = state_with(
            Arc::new(GatedStore {
                entered: Arc::clone(&entered),
                release: Arc::clone(&release),
            }),
            Arc::new(AbsentBridge),
        );
        let base = start_test_server(state).await;

        let first = {
            let base = base.clone();
            tokio::spawn(async move {
                post_check(
                    &base,
                    &serde_json::json!({"phone_number": "0912345678"}),
                    Some("form-1"),
                )
                .await
            })
        };

        // The first request is inside the lookup and holds the busy guard.
        entered.notified().await;

        let second = post_check(
            &base,
            &serde_json::json!({"phone_number": "0912345678"}),
            Some("form-1"),
        )
        .await;
        assert_eq!(second.status(), reqwest::StatusCode::TOO_MANY_REQUESTS);

        release.notify_one();
        let first = first.await.unwrap();
        assert_eq!(first.status(), reqwest::StatusCode::OK);
        let body: CheckResponse = first.json().await.unwrap();
        assert_eq!(body.status, "already_registered");
    }

    #[tokio::test]
    async fn test_session_registry_reuses_handler_per_key() {
        let state = state_with(Arc::new(StaticStore { records: vec![] }), Arc::new(AbsentBridge));

        let a1 = state.handler_for("tg:1").await;
        let a2 = state.handler_for("tg:1").await;
        let b = state.handler_for("tg:2").await;

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
    }

    #[test]
    fn test_session_key_prefers_caller_identity() {
        let headers = HeaderMap::new();
        let key = session_key(&Some(CallerId("42".to_string())), &headers);
        assert_eq!(key.as_deref(), Some("tg:42"));
    }

    #[test]
    fn test_session_key_sanitizes_header() {
        let caller = None;
        let mut headers = HeaderMap::new();
        headers.insert(CLIENT_SESSION_HEADER, "form-1".parse().unwrap());
        assert_eq!(session_key(&caller, &headers).as_deref(), Some("anon:form-1"));

        headers.insert(CLIENT_SESSION_HEADER, "bad key!".parse().unwrap());
        assert_eq!(session_key(&caller, &headers), None);

        let headers = HeaderMap::new();
        assert_eq!(session_key(&caller, &headers), None);
    }
}
