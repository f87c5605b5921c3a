//! Submission handler implementation.
//!
//! Orchestrates the full lookup pipeline for one form submit:
//! 1. Acquire the per-form busy guard (reject concurrent submits)
//! 2. Trim and validate the phone number
//! 3. Query the record store, bounded by the lookup timeout
//! 4. Resolve the status and dispatch best-effort linkage tasks
//!
//! Errors at steps 2–3 resolve to statuses, not transport errors — the
//! caller always gets exactly one status per accepted submission. Linkage
//! writes are fire-and-forget: their outcomes are logged, never awaited
//! by the critical path, and never alter the resolved status.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use minireg_types::errors::MiniregError;
use minireg_types::records::{CallerId, RegistrationRecord, SubmissionInput, SubmissionStatus};
use minireg_types::traits::RegistrationStore;

use crate::validation::PhoneValidator;

/// The submission workflow for one form instance.
///
/// Holds the injected store handle, the compiled validator, and the busy
/// flag that serializes submissions: at most one lookup-and-linkage cycle
/// runs at a time per handler. The store handle is passed in at
/// construction — the handler cannot exist without an initialized store,
/// so "store not ready" cannot be mistaken for "not found".
pub struct SubmissionHandler {
    store: Arc<dyn RegistrationStore>,
    validator: PhoneValidator,
    lookup_timeout: Duration,
    busy: AtomicBool,
}

/// RAII release for the busy flag.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl SubmissionHandler {
    /// Create a handler around an initialized store handle.
    pub fn new(store: Arc<dyn RegistrationStore>, lookup_timeout: Duration) -> Self {
        Self {
            store,
            validator: PhoneValidator::new(),
            lookup_timeout,
            busy: AtomicBool::new(false),
        }
    }

    /// Whether a submission is currently in flight on this handler.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Process one form submit.
    ///
    /// Returns exactly one [`SubmissionStatus`] for every accepted
    /// submission; the only error is [`MiniregError::Busy`], raised before
    /// the workflow starts when a prior submission on this handler is
    /// still resolving.
    ///
    /// Input whitespace is trimmed here, once, before validation — a
    /// padded-but-otherwise-valid number is accepted, and validation
    /// itself never trims.
    pub async fn submit(
        &self,
        input: &SubmissionInput,
        caller: Option<&CallerId>,
    ) -> Result<SubmissionStatus, MiniregError> {
        let _guard = self.acquire()?;

        // Step 1: validate
        let phone = input.phone_number.trim();
        if let Err(failure) = self.validator.validate(phone) {
            debug!(%failure, "submission rejected by validation");
            return Ok(SubmissionStatus::Invalid(failure));
        }

        // Step 2: lookup, bounded by the configured timeout
        let lookup = self.store.find_by_phone(phone);
        let records = match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => {
                error!(error = %e, "registration lookup failed");
                return Ok(SubmissionStatus::TransientError);
            }
            Err(_) => {
                error!(
                    timeout_secs = self.lookup_timeout.as_secs(),
                    "registration lookup timed out"
                );
                return Ok(SubmissionStatus::TransientError);
            }
        };

        // Step 3: resolve status, then dispatch linkage
        if records.is_empty() {
            debug!("no matching registration record");
            return Ok(SubmissionStatus::NotRegistered);
        }

        match caller {
            Some(caller) => {
                // Detached on purpose: the resolved status must not wait
                // for (or change on) linkage outcomes.
                let _handles = self.dispatch_linkage(&records, caller);
            }
            None => debug!("caller identity unavailable; linkage skipped"),
        }

        Ok(SubmissionStatus::AlreadyRegistered)
    }

    /// Acquire the busy flag, rejecting a submission already in flight.
    fn acquire(&self) -> Result<BusyGuard<'_>, MiniregError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(MiniregError::Busy);
        }
        Ok(BusyGuard { flag: &self.busy })
    }

    /// Spawn one independent linkage task per record still lacking a
    /// caller identity.
    ///
    /// Task outcomes are logged and otherwise discarded; the returned
    /// handles exist so tests can await completion deterministically.
    fn dispatch_linkage(
        &self,
        records: &[RegistrationRecord],
        caller: &CallerId,
    ) -> Vec<JoinHandle<()>> {
        records
            .iter()
            .filter(|record| record.is_unlinked())
            .map(|record| {
                let store = Arc::clone(&self.store);
                let caller = caller.clone();
                let record_id = record.id;
                tokio::spawn(async move {
                    match store.link_caller(&record_id, &caller).await {
                        Ok(()) => debug!(%record_id, "caller identity linked"),
                        Err(e) => {
                            warn!(%record_id, error = %e, "linkage write failed")
                        }
                    }
                })
            })
            .collect()
    }
}
