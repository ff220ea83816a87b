//! Request lifecycle state machine.
//!
//! ```text
//! Idle ──submit(valid)──▶ Submitting ──success──▶ Succeeded ──reset──▶ Idle
//!                         Submitting ──failure──▶ Failed ──submit(valid)──▶ Submitting
//!                                                 Failed ──reset──▶ Idle
//! ```
//!
//! Every submission gets a generation number and a cancellation token.
//! [`SubmissionController::invalidate`] bumps the generation, so a completion
//! that arrives for an older generation is reported as superseded and
//! leaves the state alone.
//!
//! A [`Ticket`] that is dropped before its completion is applied (a caller
//! gave up on the future, or never ran it) marks its submission abandoned;
//! [`SubmissionController::reap_abandoned`] then returns the controller to `Idle`.

use std::sync::Arc;

use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{TranslationFailure, ValidationError};
use crate::intake::IntakeManager;
use crate::result::{ArtifactStore, Download, ResultArtifact, ResultHandle};
use crate::service::TranslationRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

impl RequestState {
    pub fn is_busy(&self) -> bool {
        matches!(self, RequestState::Submitting)
    }

    /// Whether `submit` may start from this state.
    pub fn accepts_submit(&self) -> bool {
        matches!(self, RequestState::Idle | RequestState::Failed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            RequestState::Idle => "Idle",
            RequestState::Submitting => "Translating...",
            RequestState::Succeeded => "Translation complete!",
            RequestState::Failed => "Failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub message: String,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// What the caller of `submit` learns once the request settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Succeeded { filename: String },
    Failed(ErrorInfo),
    /// A reset or new selection happened first; nothing was recorded.
    Superseded,
}

/// A started submission, handed to whoever performs the request.
pub struct Ticket {
    pub generation: u64,
    pub request: TranslationRequest,
    pub cancel: CancellationToken,
    /// Marks the submission abandoned when dropped while still armed.
    pub(crate) abandon: DropGuard,
}

impl std::fmt::Debug for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticket")
            .field("generation", &self.generation)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct InFlight {
    generation: u64,
    request_id: Uuid,
    file_name: String,
    cancel: CancellationToken,
    abandoned: CancellationToken,
}

pub struct SubmissionController {
    state: RequestState,
    generation: u64,
    in_flight: Option<InFlight>,
    result: Option<ResultHandle>,
    error: Option<ErrorInfo>,
    store: Arc<dyn ArtifactStore>,
}

impl SubmissionController {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            state: RequestState::Idle,
            generation: 0,
            in_flight: None,
            result: None,
            error: None,
            store,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    pub fn result(&self) -> Option<&ResultHandle> {
        self.result.as_ref()
    }

    pub fn download(&self) -> Option<Download> {
        self.result.as_ref().map(ResultHandle::to_download)
    }

    /// Check the preconditions of `submit` without changing anything.
    pub fn check(&self, intake: &IntakeManager) -> Result<(), ValidationError> {
        match self.state {
            RequestState::Submitting => return Err(ValidationError::AlreadyInProgress),
            RequestState::Succeeded => return Err(ValidationError::ResultPending),
            RequestState::Idle | RequestState::Failed => {}
        }
        if intake.credential().is_empty() {
            return Err(ValidationError::MissingCredential);
        }
        if intake.file().is_none() {
            return Err(ValidationError::MissingFile);
        }
        Ok(())
    }

    /// Move to `Submitting` and hand out the request to perform.
    ///
    /// Missing inputs are also recorded as the current error.
    pub fn begin(&mut self, intake: &IntakeManager) -> Result<Ticket, ValidationError> {
        if let Err(e) = self.check(intake) {
            if e.is_reported() {
                self.error = Some(ErrorInfo::new(e.to_string()));
            }
            debug!("Submit rejected: {:?}", e);
            return Err(e);
        }
        let Some(file) = intake.file() else {
            return Err(ValidationError::MissingFile);
        };

        self.discard_outcome();
        self.generation += 1;

        let request = TranslationRequest {
            id: Uuid::new_v4(),
            credential: intake.credential().clone(),
            file_name: file.name.clone(),
            payload: Arc::clone(&file.raw_bytes),
        };
        let cancel = CancellationToken::new();
        let abandoned = CancellationToken::new();
        self.in_flight = Some(InFlight {
            generation: self.generation,
            request_id: request.id,
            file_name: file.name.clone(),
            cancel: cancel.clone(),
            abandoned: abandoned.clone(),
        });
        self.state = RequestState::Submitting;
        info!(request_id = %request.id, generation = self.generation, "Submitting {}", file.name);

        Ok(Ticket {
            generation: self.generation,
            request,
            cancel,
            abandon: abandoned.drop_guard(),
        })
    }

    /// Apply the result of the request started for `generation`.
    pub fn complete(&mut self, generation: u64, result: Result<Vec<u8>, TranslationFailure>) -> SubmitOutcome {
        let in_flight = match self.in_flight.take() {
            Some(in_flight) if in_flight.generation == generation && self.state == RequestState::Submitting => in_flight,
            other => {
                self.in_flight = other;
                debug!(generation, "Ignoring completion of superseded request");
                return SubmitOutcome::Superseded;
            }
        };

        match result {
            Ok(payload) => {
                let artifact = ResultArtifact::new(payload, &in_flight.file_name);
                let filename = artifact.suggested_filename.clone();
                info!(
                    request_id = %in_flight.request_id,
                    "Translation complete: {} ({} bytes)",
                    filename,
                    artifact.payload.len()
                );
                self.result = Some(ResultHandle::new(artifact, Arc::clone(&self.store)));
                self.state = RequestState::Succeeded;
                SubmitOutcome::Succeeded { filename }
            }
            Err(failure) => {
                warn!(request_id = %in_flight.request_id, "Translation failed: {}", failure);
                let error = ErrorInfo::new(failure.user_message());
                self.error = Some(error.clone());
                self.state = RequestState::Failed;
                SubmitOutcome::Failed(error)
            }
        }
    }

    /// Abort any in-flight request and return to `Idle` with no result or error.
    pub fn invalidate(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            info!(request_id = %in_flight.request_id, "Cancelling in-flight request");
            in_flight.cancel.cancel();
        }
        self.generation += 1;
        self.discard_outcome();
        self.state = RequestState::Idle;
    }

    /// Return to `Idle` if the in-flight submission's ticket was dropped unfinished.
    ///
    /// Any completion still arriving for it is reported as superseded.
    pub fn reap_abandoned(&mut self) {
        let abandoned = self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.abandoned.is_cancelled());
        if !abandoned {
            return;
        }
        if let Some(in_flight) = self.in_flight.take() {
            warn!(request_id = %in_flight.request_id, "Submission abandoned before completion");
            in_flight.cancel.cancel();
        }
        self.generation += 1;
        self.state = RequestState::Idle;
    }

    fn discard_outcome(&mut self) {
        if let Some(mut result) = self.result.take() {
            result.dispose();
        }
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::FileCandidate;
    use crate::result::{ArtifactLocation, MockArtifactStore};
    use std::path::PathBuf;

    fn counting_store(releases: usize) -> Arc<dyn ArtifactStore> {
        let mut store = MockArtifactStore::new();
        store
            .expect_register()
            .returning(|name, _| Ok(ArtifactLocation(PathBuf::from(format!("/spool/{}", name)))));
        store.expect_release().times(releases).return_const(());
        Arc::new(store)
    }

    fn ready_intake() -> IntakeManager {
        let mut intake = IntakeManager::new();
        intake.set_credential("key");
        intake.select_file(vec![FileCandidate::new("movie.srt", b"src".to_vec())]).unwrap();
        intake
    }

    #[test]
    fn test_missing_credential_is_reported() {
        let mut controller = SubmissionController::new(counting_store(0));
        let mut intake = ready_intake();
        intake.set_credential("");

        assert_eq!(controller.begin(&intake).unwrap_err(), ValidationError::MissingCredential);
        assert_eq!(controller.state(), RequestState::Idle);
        assert_eq!(controller.error().map(|e| e.message.as_str()), Some("Please enter your translation API key."));
    }

    #[test]
    fn test_missing_file_is_reported() {
        let mut controller = SubmissionController::new(counting_store(0));
        let mut intake = IntakeManager::new();
        intake.set_credential("key");

        assert_eq!(controller.begin(&intake).unwrap_err(), ValidationError::MissingFile);
        assert!(controller.error().is_some());
    }

    #[test]
    fn test_begin_hands_out_request() {
        let mut controller = SubmissionController::new(counting_store(0));
        let intake = ready_intake();

        let ticket = controller.begin(&intake).unwrap();
        assert_eq!(controller.state(), RequestState::Submitting);
        assert_eq!(ticket.request.file_name, "movie.srt");
        assert_eq!(ticket.request.credential.expose(), "key");
        assert_eq!(&*ticket.request.payload, b"src");
        assert!(!ticket.cancel.is_cancelled());
    }

    #[test]
    fn test_second_begin_is_locked_out() {
        let mut controller = SubmissionController::new(counting_store(0));
        let intake = ready_intake();

        controller.begin(&intake).unwrap();
        assert_eq!(controller.begin(&intake).unwrap_err(), ValidationError::AlreadyInProgress);
        assert!(controller.error().is_none());
        assert_eq!(controller.state(), RequestState::Submitting);
    }

    #[test]
    fn test_success_then_resubmit_needs_reset() {
        let mut controller = SubmissionController::new(counting_store(1));
        let intake = ready_intake();

        let ticket = controller.begin(&intake).unwrap();
        let outcome = controller.complete(ticket.generation, Ok(b"B".to_vec()));
        assert_eq!(outcome, SubmitOutcome::Succeeded { filename: "movie_translated.srt".to_string() });
        assert_eq!(controller.state(), RequestState::Succeeded);
        assert!(controller.error().is_none());

        assert_eq!(controller.begin(&intake).unwrap_err(), ValidationError::ResultPending);
        assert!(controller.download().is_some());

        controller.invalidate();
        assert_eq!(controller.state(), RequestState::Idle);
        assert!(controller.download().is_none());
    }

    #[test]
    fn test_failure_allows_retry_and_clears_error() {
        let mut controller = SubmissionController::new(counting_store(0));
        let intake = ready_intake();

        let ticket = controller.begin(&intake).unwrap();
        let failure = TranslationFailure::Service { status: 401, detail: Some("invalid key".to_string()) };
        let outcome = controller.complete(ticket.generation, Err(failure));
        assert_eq!(outcome, SubmitOutcome::Failed(ErrorInfo::new("invalid key")));
        assert_eq!(controller.state(), RequestState::Failed);

        controller.begin(&intake).unwrap();
        assert_eq!(controller.state(), RequestState::Submitting);
        assert!(controller.error().is_none());
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let mut controller = SubmissionController::new(counting_store(0));
        let intake = ready_intake();

        let ticket = controller.begin(&intake).unwrap();
        controller.invalidate();
        assert!(ticket.cancel.is_cancelled());

        let outcome = controller.complete(ticket.generation, Ok(b"late".to_vec()));
        assert_eq!(outcome, SubmitOutcome::Superseded);
        assert_eq!(controller.state(), RequestState::Idle);
        assert!(controller.download().is_none());
        assert!(controller.error().is_none());
    }

    #[test]
    fn test_stale_completion_does_not_touch_newer_request() {
        let mut controller = SubmissionController::new(counting_store(0));
        let intake = ready_intake();

        let old = controller.begin(&intake).unwrap();
        controller.invalidate();
        let current = controller.begin(&intake).unwrap();

        let outcome = controller.complete(old.generation, Err(TranslationFailure::Transport("late".to_string())));
        assert_eq!(outcome, SubmitOutcome::Superseded);
        assert_eq!(controller.state(), RequestState::Submitting);
        assert!(!current.cancel.is_cancelled());
        assert!(controller.error().is_none());
    }

    #[test]
    fn test_dropped_ticket_is_reaped() {
        let mut controller = SubmissionController::new(counting_store(0));
        let intake = ready_intake();

        let ticket = controller.begin(&intake).unwrap();
        let generation = ticket.generation;
        let cancel = ticket.cancel.clone();
        controller.reap_abandoned();
        assert_eq!(controller.state(), RequestState::Submitting);

        drop(ticket);
        controller.reap_abandoned();
        assert_eq!(controller.state(), RequestState::Idle);
        assert!(cancel.is_cancelled());
        assert!(controller.error().is_none());

        assert_eq!(controller.complete(generation, Ok(b"late".to_vec())), SubmitOutcome::Superseded);
        assert!(controller.begin(&intake).is_ok());
    }

    #[test]
    fn test_disarmed_ticket_is_not_reaped() {
        let mut controller = SubmissionController::new(counting_store(1));
        let intake = ready_intake();

        let ticket = controller.begin(&intake).unwrap();
        let outcome = controller.complete(ticket.generation, Ok(b"B".to_vec()));
        ticket.abandon.disarm();
        controller.reap_abandoned();

        assert!(matches!(outcome, SubmitOutcome::Succeeded { .. }));
        assert_eq!(controller.state(), RequestState::Succeeded);
    }

    #[test]
    fn test_labels() {
        assert_eq!(RequestState::Submitting.label(), "Translating...");
        assert!(RequestState::Submitting.is_busy());
        assert!(RequestState::Failed.accepts_submit());
        assert!(!RequestState::Succeeded.accepts_submit());
    }
}
