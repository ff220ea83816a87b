//! Session-scoped state and the named transitions a user can trigger.
//!
//! A [`Session`] is created at session start and shared as `Arc<Session>`
//! between whatever handles user input and the task awaiting a submission.
//! All state sits behind one mutex that is never held across an await, so
//! file re-selection, credential edits, and resets stay possible while a
//! request is outstanding.
//!
//! Dropping a submission future (a timeout, a losing `select!` arm) or a
//! ticket that was never run frees the session for the next submit.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{info, Instrument};

use crate::controller::{ErrorInfo, RequestState, SubmissionController, SubmitOutcome, Ticket};
use crate::error::{IntakeError, ValidationError};
use crate::intake::{FileCandidate, IntakeManager, SelectedFile};
use crate::result::{ArtifactStore, Download};
use crate::service::TranslationService;

struct SessionState {
    intake: IntakeManager,
    controller: SubmissionController,
}

impl SessionState {
    fn begin_submission(&mut self) -> Result<Ticket, ValidationError> {
        let SessionState { intake, controller } = self;
        controller.begin(intake)
    }
}

/// Point-in-time view of a session, for status display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: RequestState,
    pub file_name: Option<String>,
    pub file_size: Option<String>,
    pub credential_preview: Option<String>,
    pub error: Option<ErrorInfo>,
    pub result_filename: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub can_submit: bool,
}

pub struct Session {
    service: Arc<dyn TranslationService>,
    inner: Mutex<SessionState>,
}

impl Session {
    pub fn new(service: Arc<dyn TranslationService>, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            service,
            inner: Mutex::new(SessionState {
                intake: IntakeManager::new(),
                controller: SubmissionController::new(store),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.controller.reap_abandoned();
        state
    }

    /// Take in a new file. Acceptance discards any result, error, or in-flight request.
    ///
    /// An empty candidate list is a no-op; a rejected file changes nothing.
    pub fn select_file(&self, candidates: Vec<FileCandidate>) -> Result<Option<SelectedFile>, IntakeError> {
        let mut state = self.lock();
        let selected = state.intake.select_file(candidates)?.cloned();
        if selected.is_some() {
            state.controller.invalidate();
        }
        Ok(selected)
    }

    pub fn set_credential(&self, token: impl Into<String>) {
        self.lock().intake.set_credential(token);
    }

    /// Clear the file and any outcome. The credential is kept.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.intake.clear_file();
        state.controller.invalidate();
        info!("Session reset");
    }

    /// Translate the selected file.
    ///
    /// Precondition failures return immediately without any network traffic.
    /// Otherwise this waits for the single outbound request; if the session
    /// is reset or a new file is selected meanwhile, the request is aborted
    /// and [`SubmitOutcome::Superseded`] is returned.
    pub async fn submit(&self) -> Result<SubmitOutcome, ValidationError> {
        let ticket = self.start()?;
        Ok(self.run(ticket).await)
    }

    /// First half of [`Session::submit`]: validate and move to `Submitting`.
    pub fn start(&self) -> Result<Ticket, ValidationError> {
        self.lock().begin_submission()
    }

    /// Second half of [`Session::submit`]: perform the request of `ticket`.
    pub async fn run(&self, ticket: Ticket) -> SubmitOutcome {
        let Ticket { generation, request, cancel, abandon } = ticket;

        let span = tracing::info_span!("submit", request_id = %request.id);
        let result = async {
            tokio::select! {
                _ = cancel.cancelled() => None,
                result = self.service.translate(&request) => Some(result),
            }
        }
        .instrument(span)
        .await;

        let Some(result) = result else {
            abandon.disarm();
            info!(request_id = %request.id, "Request aborted before completion");
            return SubmitOutcome::Superseded;
        };

        let mut state = self.lock();
        let outcome = state.controller.complete(generation, result);
        abandon.disarm();
        outcome
    }

    pub fn can_submit(&self) -> bool {
        let state = self.lock();
        state.controller.check(&state.intake).is_ok()
    }

    pub fn state(&self) -> RequestState {
        self.lock().controller.state()
    }

    pub fn error(&self) -> Option<ErrorInfo> {
        self.lock().controller.error().cloned()
    }

    pub fn selected_file(&self) -> Option<SelectedFile> {
        self.lock().intake.file().cloned()
    }

    /// The translated file, if the last submission succeeded. Repeatable.
    pub fn download(&self) -> Option<Download> {
        self.lock().controller.download()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        let file = state.intake.file();
        let credential = state.intake.credential();
        let artifact = state.controller.result().map(|r| r.artifact());
        SessionSnapshot {
            state: state.controller.state(),
            file_name: file.map(|f| f.name.clone()),
            file_size: file.map(SelectedFile::display_size),
            credential_preview: (!credential.is_empty()).then(|| credential.masked()),
            error: state.controller.error().cloned(),
            result_filename: artifact.map(|a| a.suggested_filename.clone()),
            completed_at: artifact.map(|a| a.completed_at),
            can_submit: state.controller.check(&state.intake).is_ok(),
        }
    }
}
