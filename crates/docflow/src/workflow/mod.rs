//! Sequencing of operator actions across the transport client, the job
//! registry and the preview projection.
//!
//! Flows run on the caller's task. Requests that belong to the same view are
//! issued together with `tokio::join!` and combined only after both settle;
//! nothing is spawned and nothing is retried.

mod view;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{info, warn};
use reqwest::Url;
use tracing::{info_span, Instrument};

use crate::api::{HttpJobClient, JobApi, JobStatus};
use crate::config::ClientConfig;
use crate::error::{ApiError, DocflowError};
use crate::lifecycle::JobState;
use crate::preview::PreviewState;
use crate::registry::JobRegistry;

pub use view::{HistoryView, ResultView, Route, Section, UploadView, View};

/// A file picked or dropped by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// Client-only entry for an upload whose create call has not resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpload {
    pub ticket: u64,
    pub state: JobState,
}

/// Removes its pending upload when the create call resolves or the upload
/// is abandoned.
struct PendingGuard<'a> {
    pending: &'a Mutex<Vec<PendingUpload>>,
    ticket: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|p| p.ticket != self.ticket);
    }
}

/// Drives the upload, result, approval and history flows.
pub struct Orchestrator<A: JobApi> {
    api: Arc<A>,
    registry: JobRegistry,
    default_approver: String,
    pending: Mutex<Vec<PendingUpload>>,
    next_upload: AtomicU64,
}

impl Orchestrator<HttpJobClient> {
    /// Builds an orchestrator talking HTTP to the configured service.
    pub fn from_config(config: &ClientConfig) -> Result<Self, DocflowError> {
        let config = config.clone().validated()?;
        let api = HttpJobClient::new(&config)?;
        Ok(Self::new(Arc::new(api), &config))
    }
}

impl<A: JobApi> Orchestrator<A> {
    pub fn new(api: Arc<A>, config: &ClientConfig) -> Self {
        Self {
            api,
            registry: JobRegistry::new(),
            default_approver: config.default_approver.clone(),
            pending: Mutex::new(Vec::new()),
            next_upload: AtomicU64::new(1),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Read access to the registry for views.
    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    fn pending(&self) -> MutexGuard<'_, Vec<PendingUpload>> {
        match self.pending.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                warn!("Pending upload lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Registers a pending upload for as long as the returned guard lives.
    fn track_upload(&self, state: JobState) -> PendingGuard<'_> {
        let ticket = self.next_upload.fetch_add(1, Ordering::AcqRel);
        self.pending().push(PendingUpload { ticket, state });
        PendingGuard {
            pending: &self.pending,
            ticket,
        }
    }

    /// Uploads whose create call is still in flight.
    pub fn pending_uploads(&self) -> Vec<PendingUpload> {
        self.pending().clone()
    }

    /// Opens a route, loading whatever the target view needs.
    pub async fn navigate(&self, route: Route) -> View {
        match route {
            Route::Upload => View::Upload(self.open_upload().await),
            Route::Job(job_id) => self.open_job(&job_id).await,
            Route::History => View::History(self.open_history().await),
        }
    }

    /// Refreshes the registry and shows the upload page counters.
    pub async fn open_upload(&self) -> UploadView {
        if let Err(err) = self.registry.refresh(self.api.as_ref()).await {
            warn!("Upload page shows stale job counts: {}", err);
        }
        self.upload_view(None)
    }

    fn upload_view(&self, error: Option<ApiError>) -> UploadView {
        UploadView {
            summary: self.registry.snapshot().summary(),
            jobs_state: self.registry.load_state(),
            error,
        }
    }

    /// Submits one file.
    ///
    /// On success the registry is refreshed and the new job's view is opened.
    /// On failure the operator stays on the upload view with the error and no
    /// job entry is created locally.
    pub async fn upload(&self, files: Vec<UploadFile>) -> View {
        self.upload_as(files, None).await
    }

    /// Like [`upload`](Self::upload), recording who uploaded the file.
    pub async fn upload_as(&self, mut files: Vec<UploadFile>, uploader: Option<&str>) -> View {
        let file = match (files.pop(), files.is_empty()) {
            (Some(file), true) => file,
            (None, _) => {
                let err = ApiError::Validation("no file selected".to_string());
                return View::Upload(self.upload_view(Some(err)));
            }
            (Some(_), false) => {
                let err = ApiError::Validation(format!(
                    "exactly one file per upload, got {}",
                    files.len() + 1
                ));
                return View::Upload(self.upload_view(Some(err)));
            }
        };
        let UploadFile { filename, bytes } = file;
        if filename.trim().is_empty() {
            let err = ApiError::Validation("file has no name".to_string());
            return View::Upload(self.upload_view(Some(err)));
        }

        let span = info_span!("workflow.upload", filename = %filename);
        async move {
            let placeholder = JobState::uploading(filename.clone());
            let result = {
                let _pending = self.track_upload(placeholder.clone());
                self.api.create_job(bytes, &filename, uploader).await
            };

            let created = match result {
                Ok(created) => created,
                Err(err) => {
                    warn!("Upload of '{}' failed: {}", filename, err);
                    return View::Upload(self.upload_view(Some(err)));
                }
            };

            info!("Upload of '{}' created job {}", filename, created.job_id);
            if let Err(err) = self.registry.refresh(self.api.as_ref()).await {
                warn!("Job list refresh after upload failed: {}", err);
            }

            match self.open_result(&created.job_id).await {
                Ok(mut view) => {
                    view.state = placeholder.confirm(view.job.status().clone());
                    View::Result(Box::new(view))
                }
                Err(error) => View::JobUnavailable {
                    job_id: created.job_id,
                    error,
                },
            }
        }
        .instrument(span)
        .await
    }

    /// Loads a job view, folding a fatal job fetch into
    /// [`View::JobUnavailable`].
    pub async fn open_job(&self, job_id: &str) -> View {
        match self.open_result(job_id).await {
            Ok(view) => View::Result(Box::new(view)),
            Err(error) => View::JobUnavailable {
                job_id: job_id.to_string(),
                error,
            },
        }
    }

    /// Fetches job detail and preview together.
    ///
    /// A failed detail fetch fails the view. A failed preview fetch only
    /// affects the preview section.
    pub async fn open_result(&self, job_id: &str) -> Result<ResultView, ApiError> {
        let span = info_span!("workflow.result", job_id = %job_id);
        async {
            let (detail, preview) =
                tokio::join!(self.api.get_job(job_id), self.api.get_preview(job_id));

            let preview = PreviewState::from_fetch(preview);
            match detail {
                Ok(job) => Ok(ResultView::new(job, preview)),
                Err(err) => {
                    warn!("Job {} could not be loaded: {}", job_id, err);
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Approves the job shown in `view` as the configured default approver.
    pub async fn approve(&self, view: ResultView) -> View {
        let approver = self.default_approver.clone();
        self.approve_as(view, &approver, None).await
    }

    /// Approves the job shown in `view`.
    ///
    /// Refused locally when the displayed status is not `completed`. The
    /// service has the last word: its rejection keeps the operator on the
    /// result view with the error set. Success moves to the history view.
    pub async fn approve_as(&self, view: ResultView, approver: &str, notes: Option<&str>) -> View {
        let job_id = view.job.job_id().to_string();

        if let Err(err) = view.state.ensure_approvable() {
            info!("Approval of {} refused before sending: {}", job_id, err);
            return View::Result(Box::new(view.with_action_error(err)));
        }

        let span = info_span!("workflow.approve", job_id = %job_id);
        async move {
            match self.api.approve_job(&job_id, approver, notes).await {
                Ok(_) => View::History(self.open_history().await),
                Err(err) => {
                    warn!("Approval of {} rejected: {}", job_id, err);
                    View::Result(Box::new(view.with_action_error(err)))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Refreshes jobs and fetches model history independently.
    pub async fn open_history(&self) -> HistoryView {
        let span = info_span!("workflow.history");
        async {
            let (jobs, models) = tokio::join!(
                self.registry.refresh(self.api.as_ref()),
                self.api.list_model_history()
            );

            if let Err(err) = jobs {
                warn!("History shows stale jobs: {}", err);
            }
            let models = match models {
                Ok(items) => Section::Loaded(items),
                Err(err) => {
                    warn!("Model history unavailable: {}", err);
                    Section::Unavailable {
                        reason: err.to_string(),
                    }
                }
            };

            let snapshot = self.registry.snapshot();
            HistoryView {
                approved_jobs: snapshot
                    .filter_by_status(&JobStatus::Approved)
                    .cloned()
                    .collect(),
                jobs_state: self.registry.load_state(),
                models,
            }
        }
        .instrument(span)
        .await
    }

    /// Where to send the operator to download a job's CSV.
    pub fn download_location(&self, job_id: &str) -> Result<Url, ApiError> {
        self.api.download_location(job_id)
    }
}
