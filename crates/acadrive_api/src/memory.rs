use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use acadrive_contract::{ApiError, FileRecord, SearchFilters, Stats, UploadRequest};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::client::{AcadriveApi, ProgressFn};

const RECENT_LIMIT: usize = 5;

/// In-memory stand-in for the remote backend. Used by tests and by the
/// offline CLI mode; mirrors the backend's search and stats semantics over a
/// local record set, and can be scripted to fail or stall per endpoint.
#[derive(Default)]
pub struct InMemoryAcadriveApi {
    records: Mutex<Vec<FileRecord>>,
    next_id: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub recent_calls: AtomicUsize,
    pub search_calls: Mutex<Vec<String>>,
    pub stats_calls: AtomicUsize,
    fail_recent: AtomicBool,
    fail_search: AtomicBool,
    fail_stats: AtomicBool,
    upload_failure: Mutex<Option<ApiError>>,
    upload_delay: Mutex<Option<Duration>>,
    recent_delay: Mutex<Option<Duration>>,
    search_delays: Mutex<HashMap<String, Duration>>,
}

impl InMemoryAcadriveApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeded with a handful of records, newest first.
    pub fn with_fixtures() -> Self {
        let fixtures = [
            ("algorithms_cheatsheet.pdf", "Computer Science", 482_133),
            ("linear_algebra_notes.pdf", "Mathematics", 1_572_864),
            ("waves_lab_report.docx", "Physics", 88_203),
            ("cell_diagram.png", "Biology", 734_003),
            ("thermo_summary.txt", "Physics", 12_040),
        ];
        let mut records = Vec::new();
        for (index, (filename, subject, size)) in fixtures.into_iter().enumerate() {
            records.push(FileRecord {
                id: (index + 1) as i64,
                filename: filename.to_string(),
                subject: subject.to_string(),
                file_size: size,
                file_url: format!("/uploads/{filename}"),
                file_type: Some(infer_file_type(filename).to_string()),
                created_at: Some(Utc::now().to_rfc3339()),
                preview_url: None,
            });
        }
        let api = Self {
            records: Mutex::new(records),
            ..Self::default()
        };
        let seeded = fixtures.len();
        api.next_id.store(seeded + 1, Ordering::SeqCst);
        api
    }

    pub async fn seed(&self, records: Vec<FileRecord>) {
        let next = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        self.next_id.store(next as usize, Ordering::SeqCst);
        *self.records.lock().await = records;
    }

    pub fn fail_recent_files(&self, fail: bool) {
        self.fail_recent.store(fail, Ordering::SeqCst);
    }

    pub fn fail_search(&self, fail: bool) {
        self.fail_search.store(fail, Ordering::SeqCst);
    }

    pub fn fail_stats(&self, fail: bool) {
        self.fail_stats.store(fail, Ordering::SeqCst);
    }

    pub async fn delay_recent_files(&self, delay: Duration) {
        *self.recent_delay.lock().await = Some(delay);
    }

    pub async fn fail_next_upload(&self, error: ApiError) {
        *self.upload_failure.lock().await = Some(error);
    }

    pub async fn delay_uploads(&self, delay: Duration) {
        *self.upload_delay.lock().await = Some(delay);
    }

    /// Stall responses for one specific query, for response-ordering tests.
    pub async fn delay_search(&self, query: &str, delay: Duration) {
        self.search_delays
            .lock()
            .await
            .insert(query.to_string(), delay);
    }

    pub async fn search_queries(&self) -> Vec<String> {
        self.search_calls.lock().await.clone()
    }

    fn matches(record: &FileRecord, query: &str, filters: &SearchFilters) -> bool {
        let needle = query.to_lowercase();
        let hit = record.filename.to_lowercase().contains(&needle)
            || record.subject.to_lowercase().contains(&needle);
        if !hit {
            return false;
        }
        if let Some(subject) = filters.subject.as_deref().filter(|s| !s.is_empty()) {
            if record.subject != subject {
                return false;
            }
        }
        if let Some(file_type) = filters.file_type.as_deref().filter(|s| !s.is_empty()) {
            if record.file_type.as_deref() != Some(file_type) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl AcadriveApi for InMemoryAcadriveApi {
    async fn upload_file(
        &self,
        request: UploadRequest,
        on_progress: ProgressFn,
    ) -> Result<FileRecord, ApiError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        request.validate()?;

        if let Some(delay) = *self.upload_delay.lock().await {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.upload_failure.lock().await.take() {
            return Err(error);
        }

        for percent in [25u8, 50, 75, 100] {
            on_progress(percent);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst).max(1) as i64;
        let record = FileRecord {
            id,
            filename: request.file_name.clone(),
            subject: request.subject.clone(),
            file_size: request.size(),
            file_url: format!("/uploads/{}", request.file_name),
            file_type: Some(infer_file_type(&request.file_name).to_string()),
            created_at: Some(Utc::now().to_rfc3339()),
            preview_url: None,
        };
        self.records.lock().await.insert(0, record.clone());
        Ok(record)
    }

    async fn recent_files(&self) -> Result<Vec<FileRecord>, ApiError> {
        self.recent_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = *self.recent_delay.lock().await {
            tokio::time::sleep(delay).await;
        }
        if self.fail_recent.load(Ordering::SeqCst) {
            return Err(ApiError::Server {
                status: 500,
                detail: "request failed with status 500".to_string(),
            });
        }
        let records = self.records.lock().await;
        Ok(records.iter().take(RECENT_LIMIT).cloned().collect())
    }

    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<FileRecord>, ApiError> {
        self.search_calls.lock().await.push(query.to_string());
        let delay = self.search_delays.lock().await.get(query).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(ApiError::Server {
                status: 500,
                detail: "search index unavailable".to_string(),
            });
        }
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|record| Self::matches(record, query, filters))
            .cloned()
            .collect())
    }

    async fn stats(&self) -> Result<Stats, ApiError> {
        self.stats_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_stats.load(Ordering::SeqCst) {
            return Err(ApiError::Network("connection refused".to_string()));
        }
        let records = self.records.lock().await;
        let mut subjects: Vec<&str> = records.iter().map(|r| r.subject.as_str()).collect();
        subjects.sort_unstable();
        subjects.dedup();
        Ok(Stats {
            total_files: records.len() as u64,
            total_subjects: subjects.len() as u64,
            // the backend reports a single active user
            active_users: 1,
        })
    }

    async fn health(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

/// Coarse classification used by the backend: pdf, image or document.
fn infer_file_type(filename: &str) -> &'static str {
    let lowered = filename.to_lowercase();
    if lowered.ends_with(".pdf") {
        "pdf"
    } else if lowered.ends_with(".jpg") || lowered.ends_with(".jpeg") || lowered.ends_with(".png") {
        "image"
    } else {
        "document"
    }
}
