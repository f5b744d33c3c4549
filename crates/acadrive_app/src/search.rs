use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::debounce::Debouncer;
use crate::state::{AppState, UiEvent};

/// Queries shorter than this never reach the network.
pub const MIN_QUERY_LEN: usize = 2;
/// Quiet window before an edited query is dispatched.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

/// Owns the query box: debounced dispatch on edits, immediate re-issue on
/// filter changes, and the manual clear/refresh affordances. The sequence
/// counter guarantees that only the most recently dispatched query may
/// overwrite `search_results`, even if an older response arrives late.
pub struct SearchController {
    state: AppState,
    query: String,
    seq: Arc<AtomicU64>,
    debouncer: Debouncer,
    refreshing: Arc<AtomicBool>,
}

impl SearchController {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            query: String::new(),
            seq: Arc::new(AtomicU64::new(0)),
            debouncer: Debouncer::new(DEBOUNCE_WINDOW),
            refreshing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Called on every edit of the query box.
    ///
    /// Length 0 clears the results and shows the empty state without a
    /// network call. Length 1 is a dead zone: no call, previous results are
    /// held unchanged. Length 2 and up schedules a debounced dispatch.
    pub async fn set_query(&mut self, input: &str) {
        self.query = input.trim().to_string();

        if self.query.is_empty() {
            self.debouncer.cancel();
            self.invalidate_in_flight();
            self.state.search_results.write().await.clear();
            self.state.emit(UiEvent::SearchCleared);
            return;
        }
        if self.query.chars().count() < MIN_QUERY_LEN {
            self.debouncer.cancel();
            return;
        }

        let state = self.state.clone();
        let seq = self.seq.clone();
        let token = seq.fetch_add(1, Ordering::SeqCst) + 1;
        let query = self.query.clone();
        self.debouncer
            .schedule(async move { dispatch(state, query, seq, token).await });
    }

    pub async fn set_subject_filter(&mut self, subject: Option<String>) {
        let normalized = subject.filter(|s| !s.trim().is_empty());
        self.state.filters.write().await.subject = normalized;
        self.reissue().await;
    }

    pub async fn set_type_filter(&mut self, file_type: Option<String>) {
        let normalized = file_type.filter(|s| !s.trim().is_empty());
        self.state.filters.write().await.file_type = normalized;
        self.reissue().await;
    }

    /// Filter changes bypass the debounce window: re-issue the current query
    /// right away when it meets the length threshold.
    async fn reissue(&mut self) {
        if self.query.chars().count() < MIN_QUERY_LEN {
            return;
        }
        self.debouncer.cancel();
        let token = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        dispatch(
            self.state.clone(),
            self.query.clone(),
            self.seq.clone(),
            token,
        )
        .await;
    }

    /// Manual clear: empty the query box and restore the empty state.
    pub async fn clear(&mut self) {
        self.query.clear();
        self.debouncer.cancel();
        self.invalidate_in_flight();
        self.state.search_results.write().await.clear();
        self.state.emit(UiEvent::SearchCleared);
    }

    /// Manual refresh of the recent-files panel, independent of the search
    /// path. Re-entry while a fetch is in flight is ignored.
    pub async fn refresh_recent(&self) {
        if self.refreshing.swap(true, Ordering::SeqCst) {
            debug!("recent refresh already in flight");
            return;
        }
        self.state.emit(UiEvent::RecentRefreshStarted);
        match self.state.api.recent_files().await {
            Ok(files) => {
                let count = files.len();
                *self.state.recent_files.write().await = files;
                self.state.emit(UiEvent::RecentFilesUpdated { count });
            }
            Err(err) => {
                warn!(error = %err, "manual recent refresh failed");
                self.state.emit(UiEvent::RecentFilesFailed {
                    message: err.to_string(),
                });
            }
        }
        self.refreshing.store(false, Ordering::SeqCst);
    }

    fn invalidate_in_flight(&self) {
        self.seq.fetch_add(1, Ordering::SeqCst);
    }
}

async fn dispatch(state: AppState, query: String, seq: Arc<AtomicU64>, token: u64) {
    state.emit(UiEvent::SearchStarted {
        query: query.clone(),
    });
    let filters = state.filters.read().await.clone();
    let outcome = state.api.search(&query, &filters).await;

    if seq.load(Ordering::SeqCst) != token {
        debug!(query = %query, "dropping superseded search response");
        return;
    }

    match outcome {
        Ok(files) => {
            let count = files.len();
            *state.search_results.write().await = files;
            state.emit(UiEvent::SearchResultsUpdated { query, count });
        }
        Err(err) => {
            warn!(error = %err, query = %query, "search failed");
            // do not leave stale results behind a failed query
            state.search_results.write().await.clear();
            state.emit(UiEvent::SearchFailed {
                query,
                message: err.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acadrive_api::{AcadriveApi, InMemoryAcadriveApi};
    use acadrive_contract::UploadRequest;
    use tokio::time::advance;

    async fn seeded_api() -> Arc<InMemoryAcadriveApi> {
        let api = Arc::new(InMemoryAcadriveApi::new());
        for (name, subject) in [
            ("algorithms.pdf", "Computer Science"),
            ("algebra.pdf", "Mathematics"),
        ] {
            let request = UploadRequest::new(subject, name, "application/pdf", vec![1]);
            api.upload_file(request, Arc::new(|_| {})).await.unwrap();
        }
        api
    }

    async fn settle() {
        advance(Duration::from_millis(301)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_keystrokes_issue_one_call_for_the_last_value() {
        let api = seeded_api().await;
        let state = AppState::new(api.clone());
        let mut controller = SearchController::new(state.clone());

        // keystrokes at t = 0, 50, 100 ms, then the final one at 350 ms
        controller.set_query("al").await;
        advance(Duration::from_millis(50)).await;
        controller.set_query("alg").await;
        advance(Duration::from_millis(50)).await;
        controller.set_query("algo").await;
        advance(Duration::from_millis(250)).await;
        controller.set_query("algorithm").await;
        settle().await;

        assert_eq!(api.search_queries().await, vec!["algorithm".to_string()]);
        let results = state.search_results.read().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].filename, "algorithms.pdf");
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_edits_within_the_window_fire_once() {
        let api = seeded_api().await;
        let state = AppState::new(api.clone());
        let mut controller = SearchController::new(state);

        controller.set_query("algo").await;
        advance(Duration::from_millis(100)).await;
        controller.set_query("algorithm").await;
        settle().await;

        assert_eq!(api.search_queries().await, vec!["algorithm".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_query_clears_without_a_network_call() {
        let api = seeded_api().await;
        let state = AppState::new(api.clone());
        let mut controller = SearchController::new(state.clone());

        controller.set_query("algo").await;
        settle().await;
        assert_eq!(state.search_results.read().await.len(), 1);

        let mut events = state.subscribe();
        controller.set_query("").await;
        settle().await;

        assert!(state.search_results.read().await.is_empty());
        assert!(matches!(events.try_recv().unwrap(), UiEvent::SearchCleared));
        assert_eq!(api.search_queries().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn single_character_query_holds_previous_results() {
        let api = seeded_api().await;
        let state = AppState::new(api.clone());
        let mut controller = SearchController::new(state.clone());

        controller.set_query("algo").await;
        settle().await;
        assert_eq!(state.search_results.read().await.len(), 1);

        controller.set_query("a").await;
        settle().await;

        // dead zone: no call, previous results untouched
        assert_eq!(api.search_queries().await.len(), 1);
        assert_eq!(state.search_results.read().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn filter_change_reissues_immediately() {
        let api = seeded_api().await;
        let state = AppState::new(api.clone());
        let mut controller = SearchController::new(state.clone());

        controller.set_query("al").await;
        settle().await;
        assert_eq!(api.search_queries().await.len(), 1);

        // no debounce window on filter changes
        controller
            .set_subject_filter(Some("Mathematics".to_string()))
            .await;

        assert_eq!(api.search_queries().await.len(), 2);
        let results = state.search_results.read().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].subject, "Mathematics");
    }

    #[tokio::test(start_paused = true)]
    async fn filter_change_below_threshold_stays_local() {
        let api = seeded_api().await;
        let state = AppState::new(api.clone());
        let mut controller = SearchController::new(state);

        controller.set_query("a").await;
        controller
            .set_subject_filter(Some("Physics".to_string()))
            .await;
        settle().await;

        assert!(api.search_queries().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_stale_response_never_clobbers_a_newer_one() {
        let api = seeded_api().await;
        api.delay_search("algebra", Duration::from_millis(500)).await;
        let state = AppState::new(api.clone());
        let seq = Arc::new(AtomicU64::new(0));

        // older dispatch stalls on the wire; a newer one resolves first
        let stale_token = seq.fetch_add(1, Ordering::SeqCst) + 1;
        let stale = tokio::spawn(dispatch(
            state.clone(),
            "algebra".to_string(),
            seq.clone(),
            stale_token,
        ));
        tokio::task::yield_now().await;
        let fresh_token = seq.fetch_add(1, Ordering::SeqCst) + 1;
        dispatch(state.clone(), "algorithm".to_string(), seq.clone(), fresh_token).await;

        let results = state.search_results.read().await.clone();
        assert_eq!(results[0].filename, "algorithms.pdf");

        advance(Duration::from_millis(600)).await;
        stale.await.unwrap();

        // the late response was dropped
        let results = state.search_results.read().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].filename, "algorithms.pdf");
    }

    #[tokio::test(start_paused = true)]
    async fn search_failure_clears_results_and_reports() {
        let api = seeded_api().await;
        let state = AppState::new(api.clone());
        let mut controller = SearchController::new(state.clone());

        controller.set_query("algo").await;
        settle().await;
        assert!(!state.search_results.read().await.is_empty());

        // a rejected query must not leave the stale panel behind
        api.fail_search(true);
        let mut events = state.subscribe();
        controller.set_query("algorithm").await;
        settle().await;

        assert!(state.search_results.read().await.is_empty());
        assert!(matches!(events.try_recv().unwrap(), UiEvent::SearchStarted { .. }));
        assert!(matches!(
            events.try_recv().unwrap(),
            UiEvent::SearchFailed { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn manual_refresh_ignores_reentry_while_in_flight() {
        let api = seeded_api().await;
        api.delay_recent_files(Duration::from_millis(100)).await;
        let state = AppState::new(api.clone());
        let controller = Arc::new(SearchController::new(state));

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.refresh_recent().await })
        };
        tokio::task::yield_now().await;
        controller.refresh_recent().await;
        first.await.unwrap();

        assert_eq!(api.recent_calls.load(Ordering::SeqCst), 1);
    }
}
