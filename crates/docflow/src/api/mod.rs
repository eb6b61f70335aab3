//! Typed access to the job service.
//!
//! [`JobApi`] is the contract the rest of the crate depends on;
//! [`HttpJobClient`] implements it over HTTP. No operation retries on its
//! own: every failure surfaces once to the caller.

pub mod client;
pub mod models;

use async_trait::async_trait;
use reqwest::Url;

use crate::error::ApiError;

pub use client::HttpJobClient;
pub use models::{
    ApprovalReceipt, ApprovalRequest, HealthStatus, JobCreated, JobDetail, JobStatus, JobSummary,
    MasterRecord, Metadata, ModelMetadata, PreviewPayload, PreviewRow, ValidationResult,
};

/// Result type for job service calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Operations offered by the job service.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Current job set, in whatever order the service returns it.
    async fn list_jobs(&self) -> ApiResult<Vec<JobSummary>>;

    /// Fails with [`ApiError::NotFound`] for unknown ids.
    async fn get_job(&self, job_id: &str) -> ApiResult<JobDetail>;

    /// Uploads one file. Never retried, to avoid creating duplicate jobs.
    async fn create_job(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        uploader: Option<&str>,
    ) -> ApiResult<JobCreated>;

    /// Fails with [`ApiError::NotFound`] while the preview is not generated.
    async fn get_preview(&self, job_id: &str) -> ApiResult<PreviewPayload>;

    /// Fails with [`ApiError::InvalidState`] when the service refuses the
    /// approval for the job's current status.
    async fn approve_job(
        &self,
        job_id: &str,
        approver: &str,
        notes: Option<&str>,
    ) -> ApiResult<ApprovalReceipt>;

    async fn list_model_history(&self) -> ApiResult<Vec<ModelMetadata>>;

    async fn list_master_data(&self) -> ApiResult<Vec<MasterRecord>>;

    async fn health(&self) -> ApiResult<HealthStatus>;

    /// Address of the job's CSV output. Pure: no request is made.
    fn download_location(&self, job_id: &str) -> ApiResult<Url>;
}
