//! Scripted in-memory job service.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Duration;
use reqwest::Url;
use tokio::sync::oneshot;

use docflow::api::{
    ApiResult, ApprovalReceipt, HealthStatus, JobApi, JobCreated, JobDetail, JobStatus,
    JobSummary, MasterRecord, ModelMetadata, PreviewPayload,
};
use docflow::ApiError;

use super::builders;

/// A request the fake received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListJobs,
    GetJob(String),
    CreateJob {
        filename: String,
        size: usize,
        uploader: Option<String>,
    },
    GetPreview(String),
    Approve {
        job_id: String,
        approver: String,
    },
    ModelHistory,
    MasterData,
    Health,
}

#[derive(Default)]
struct FakeState {
    jobs: Vec<JobDetail>,
    previews: HashMap<String, PreviewPayload>,
    list_error: Option<ApiError>,
    preview_error: Option<ApiError>,
    history: Option<ApiResult<Vec<ModelMetadata>>>,
    create_error: Option<ApiError>,
    approve_error: Option<ApiError>,
    next_ids: VecDeque<String>,
    create_gate: Option<oneshot::Receiver<()>>,
    list_gates: VecDeque<oneshot::Receiver<ApiResult<Vec<JobSummary>>>>,
    calls: Vec<Call>,
}

/// Behaves like the job service: approvals are only accepted for completed
/// jobs, unknown ids are `NotFound`, previews exist only when registered.
pub struct FakeJobApi {
    state: Mutex<FakeState>,
    base: Url,
}

impl Default for FakeJobApi {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeJobApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            base: Url::parse("http://jobs.test").expect("valid url"),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake state lock")
    }

    pub fn with_job(self, job: JobDetail) -> Self {
        self.state().jobs.push(job);
        self
    }

    pub fn with_preview(self, payload: PreviewPayload) -> Self {
        self.state()
            .previews
            .insert(payload.job_id.clone(), payload);
        self
    }

    pub fn with_history(self, history: ApiResult<Vec<ModelMetadata>>) -> Self {
        self.state().history = Some(history);
        self
    }

    pub fn with_next_id(self, job_id: &str) -> Self {
        self.state().next_ids.push_back(job_id.to_string());
        self
    }

    pub fn fail_list(&self, error: Option<ApiError>) {
        self.state().list_error = error;
    }

    pub fn fail_previews(&self, error: Option<ApiError>) {
        self.state().preview_error = error;
    }

    pub fn fail_create(&self, error: Option<ApiError>) {
        self.state().create_error = error;
    }

    pub fn fail_approve(&self, error: Option<ApiError>) {
        self.state().approve_error = error;
    }

    /// Holds the next create call until the returned sender fires.
    pub fn gate_create(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state().create_gate = Some(rx);
        tx
    }

    /// Queues a list response delivered when the returned sender fires.
    /// Gated responses are consumed in call order.
    pub fn gate_list(&self) -> oneshot::Sender<ApiResult<Vec<JobSummary>>> {
        let (tx, rx) = oneshot::channel();
        self.state().list_gates.push_back(rx);
        tx
    }

    /// Simulates the pipeline moving a job on.
    pub fn set_status(&self, job_id: &str, status: JobStatus) {
        let mut state = self.state();
        if let Some(job) = state.jobs.iter_mut().find(|j| j.job_id() == job_id) {
            job.summary.status = status;
            job.summary.updated_at += Duration::minutes(1);
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.state().calls.iter().filter(|c| matches(c)).count()
    }

    fn record(&self, call: Call) {
        self.state().calls.push(call);
    }

    fn summaries(&self) -> Vec<JobSummary> {
        self.state()
            .jobs
            .iter()
            .map(|j| j.summary.clone())
            .collect()
    }
}

#[async_trait]
impl JobApi for FakeJobApi {
    async fn list_jobs(&self) -> ApiResult<Vec<JobSummary>> {
        self.record(Call::ListJobs);

        let gate = self.state().list_gates.pop_front();
        if let Some(gate) = gate {
            return gate
                .await
                .unwrap_or_else(|_| Err(ApiError::Transport("gate dropped".to_string())));
        }

        if let Some(err) = self.state().list_error.clone() {
            return Err(err);
        }
        Ok(self.summaries())
    }

    async fn get_job(&self, job_id: &str) -> ApiResult<JobDetail> {
        self.record(Call::GetJob(job_id.to_string()));
        self.state()
            .jobs
            .iter()
            .find(|j| j.job_id() == job_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))
    }

    async fn create_job(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        uploader: Option<&str>,
    ) -> ApiResult<JobCreated> {
        self.record(Call::CreateJob {
            filename: filename.to_string(),
            size: bytes.len(),
            uploader: uploader.map(str::to_string),
        });

        let gate = self.state().create_gate.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let mut state = self.state();
        if let Some(err) = state.create_error.clone() {
            return Err(err);
        }

        let job_id = state
            .next_ids
            .pop_front()
            .unwrap_or_else(|| format!("job-{}", state.jobs.len() + 1));
        state
            .jobs
            .push(builders::detail(&job_id, filename, JobStatus::Queued));

        Ok(JobCreated { job_id })
    }

    async fn get_preview(&self, job_id: &str) -> ApiResult<PreviewPayload> {
        self.record(Call::GetPreview(job_id.to_string()));
        let state = self.state();
        if let Some(err) = state.preview_error.clone() {
            return Err(err);
        }
        state
            .previews
            .get(job_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Preview not available".to_string()))
    }

    async fn approve_job(
        &self,
        job_id: &str,
        approver: &str,
        notes: Option<&str>,
    ) -> ApiResult<ApprovalReceipt> {
        self.record(Call::Approve {
            job_id: job_id.to_string(),
            approver: approver.to_string(),
        });

        let mut state = self.state();
        if let Some(err) = state.approve_error.clone() {
            return Err(err);
        }

        let job = state
            .jobs
            .iter_mut()
            .find(|j| j.job_id() == job_id)
            .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))?;

        if job.summary.status != JobStatus::Completed {
            return Err(ApiError::InvalidState(format!(
                "Job is {}",
                job.summary.status
            )));
        }

        job.summary.status = JobStatus::Approved;
        job.summary.updated_at += Duration::minutes(1);
        job.approved_at = Some(job.summary.updated_at);

        Ok(ApprovalReceipt {
            job_id: job_id.to_string(),
            approved: true,
            approved_at: job.summary.updated_at.to_rfc3339(),
            notes: notes.map(str::to_string),
        })
    }

    async fn list_model_history(&self) -> ApiResult<Vec<ModelMetadata>> {
        self.record(Call::ModelHistory);
        self.state().history.clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn list_master_data(&self) -> ApiResult<Vec<MasterRecord>> {
        self.record(Call::MasterData);
        Ok(Vec::new())
    }

    async fn health(&self) -> ApiResult<HealthStatus> {
        self.record(Call::Health);
        Ok(HealthStatus {
            status: "ok".to_string(),
        })
    }

    fn download_location(&self, job_id: &str) -> ApiResult<Url> {
        self.base
            .join(&format!("download/{}", job_id))
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))
    }
}
