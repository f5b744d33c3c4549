use std::sync::Arc;

use acadrive_api::AcadriveApi;
use acadrive_contract::{FileRecord, SearchFilters, Stats};
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tracing::warn;

/// Everything the rendering layer needs to know about, fanned out over a
/// broadcast bus so state updates stay free of any presentation concern.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent {
    ValidationFailed { message: String },
    UploadStarted { attempt_id: String, filename: String },
    UploadProgress { attempt_id: String, percent: u8 },
    UploadSucceeded { attempt_id: String, record: FileRecord },
    UploadFailed { attempt_id: String, message: String },
    ProgressHidden { attempt_id: String },
    RecentRefreshStarted,
    RecentFilesUpdated { count: usize },
    RecentFilesFailed { message: String },
    StatsUpdated { stats: Stats },
    SearchStarted { query: String },
    SearchResultsUpdated { query: String, count: usize },
    SearchFailed { query: String, message: String },
    SearchCleared,
}

/// Last-known server data plus the active filters. Single shared instance;
/// every field is replaced wholesale after a successful fetch, never merged,
/// and each field has exactly one writing controller.
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn AcadriveApi>,
    pub recent_files: Arc<RwLock<Vec<FileRecord>>>,
    pub search_results: Arc<RwLock<Vec<FileRecord>>>,
    pub stats: Arc<RwLock<Option<Stats>>>,
    pub filters: Arc<RwLock<SearchFilters>>,
    ui_bus: broadcast::Sender<UiEvent>,
}

impl AppState {
    pub fn new(api: Arc<dyn AcadriveApi>) -> Self {
        let (ui_bus, _) = broadcast::channel(256);
        Self {
            api,
            recent_files: Arc::new(RwLock::new(Vec::new())),
            search_results: Arc::new(RwLock::new(Vec::new())),
            stats: Arc::new(RwLock::new(None)),
            filters: Arc::new(RwLock::new(SearchFilters::default())),
            ui_bus,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.ui_bus.subscribe()
    }

    pub fn event_sender(&self) -> broadcast::Sender<UiEvent> {
        self.ui_bus.clone()
    }

    pub fn emit(&self, event: UiEvent) {
        let _ = self.ui_bus.send(event);
    }

    /// Refetch recent files and stats concurrently. The two calls are
    /// independent: failure of one never blocks the other, and neither
    /// failure escapes the caller. Stats failures are log-only; a recent
    /// files failure gets its own error event so the panel can say so.
    /// Used both at bootstrap and after a successful upload.
    pub async fn refresh(&self) {
        let (recent, stats) = tokio::join!(self.api.recent_files(), self.api.stats());

        match recent {
            Ok(files) => {
                let count = files.len();
                *self.recent_files.write().await = files;
                self.emit(UiEvent::RecentFilesUpdated { count });
            }
            Err(err) => {
                warn!(error = %err, "recent files refresh failed");
                self.emit(UiEvent::RecentFilesFailed {
                    message: err.to_string(),
                });
            }
        }

        match stats {
            Ok(fresh) => {
                *self.stats.write().await = Some(fresh);
                self.emit(UiEvent::StatsUpdated { stats: fresh });
            }
            Err(err) => {
                // stats are non-critical: keep the previous values
                warn!(error = %err, "stats refresh failed");
            }
        }
    }
}
