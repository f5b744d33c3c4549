use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use acadrive_api::ProgressFn;
use acadrive_contract::UploadRequest;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::{AppState, UiEvent};

/// How long the final percentage stays visible before the bar is hidden.
pub const PROGRESS_LINGER: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    Validating,
    Uploading,
    Success,
    Failed,
}

/// What happened to a submit call, as distinct from the upload itself: the
/// upload's own outcome is reported through `UploadSucceeded`/`UploadFailed`
/// events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The request passed validation and the upload ran to a terminal state.
    Completed,
    /// Rejected before any network activity; an inline message was emitted.
    InvalidInput,
    /// Another upload is in flight; the submit was ignored.
    Busy,
}

/// Drives one upload at a time through
/// `Idle -> Validating -> Uploading -> {Success, Failed} -> Idle`.
/// There is no cancellation path once the transfer has started, and no
/// queueing: submits during `Uploading` are dropped.
#[derive(Clone)]
pub struct UploadController {
    state: AppState,
    phase: Arc<RwLock<UploadPhase>>,
}

impl UploadController {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            phase: Arc::new(RwLock::new(UploadPhase::Idle)),
        }
    }

    pub async fn phase(&self) -> UploadPhase {
        *self.phase.read().await
    }

    pub async fn submit(&self, request: UploadRequest) -> SubmitOutcome {
        {
            let mut phase = self.phase.write().await;
            if *phase != UploadPhase::Idle {
                debug!("submit ignored: an upload is already in flight");
                return SubmitOutcome::Busy;
            }
            *phase = UploadPhase::Validating;
        }

        if let Err(err) = request.validate() {
            self.state.emit(UiEvent::ValidationFailed {
                message: err.to_string(),
            });
            *self.phase.write().await = UploadPhase::Idle;
            return SubmitOutcome::InvalidInput;
        }

        let attempt_id = Uuid::now_v7().to_string();
        *self.phase.write().await = UploadPhase::Uploading;
        self.state.emit(UiEvent::UploadStarted {
            attempt_id: attempt_id.clone(),
            filename: request.file_name.clone(),
        });

        let outcome = self
            .state
            .api
            .upload_file(request, self.progress_reporter(&attempt_id))
            .await;

        match outcome {
            Ok(record) => {
                *self.phase.write().await = UploadPhase::Success;
                info!(attempt_id = %attempt_id, filename = %record.filename, "upload accepted");
                self.state.emit(UiEvent::UploadSucceeded {
                    attempt_id: attempt_id.clone(),
                    record,
                });
                // refresh failures are logged inside and never roll back the
                // success state
                self.state.refresh().await;
            }
            Err(err) => {
                *self.phase.write().await = UploadPhase::Failed;
                warn!(attempt_id = %attempt_id, error = %err, "upload failed");
                self.state.emit(UiEvent::UploadFailed {
                    attempt_id: attempt_id.clone(),
                    message: err.to_string(),
                });
            }
        }

        self.schedule_progress_hide(attempt_id);
        *self.phase.write().await = UploadPhase::Idle;
        SubmitOutcome::Completed
    }

    /// Forward transfer progress to the bus, strictly increasing. The 0%
    /// baseline is implied by `UploadStarted`.
    fn progress_reporter(&self, attempt_id: &str) -> ProgressFn {
        let bus = self.state.event_sender();
        let attempt_id = attempt_id.to_string();
        let highest = Arc::new(AtomicU8::new(0));
        Arc::new(move |percent| {
            let previous = highest.fetch_max(percent, Ordering::SeqCst);
            if percent > previous {
                let _ = bus.send(UiEvent::UploadProgress {
                    attempt_id: attempt_id.clone(),
                    percent,
                });
            }
        })
    }

    /// Terminal states leave the final percentage visible briefly.
    fn schedule_progress_hide(&self, attempt_id: String) {
        let bus = self.state.event_sender();
        tokio::spawn(async move {
            tokio::time::sleep(PROGRESS_LINGER).await;
            let _ = bus.send(UiEvent::ProgressHidden { attempt_id });
        });
    }
}
