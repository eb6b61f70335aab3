//! Wire types exchanged with the job service.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque passthrough mapping (`metadata`, `metrics`).
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Server-reported status of a job.
///
/// Statuses this client does not know are kept verbatim in `Unknown` so a
/// newer backend cannot break decoding of the whole job list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Received,
    Queued,
    Processing,
    Completed,
    Failed,
    Approved,
    Unknown(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Received => "received",
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Approved => "approved",
            JobStatus::Unknown(other) => other,
        }
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "received" => JobStatus::Received,
            "queued" => JobStatus::Queued,
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            "approved" => JobStatus::Approved,
            _ => {
                log::warn!("Unknown job status '{}' reported by job service", value);
                JobStatus::Unknown(value)
            }
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job as it appears in the job list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    /// Server-assigned identifier.
    pub job_id: String,
    pub status: JobStatus,
    /// Name of the uploaded file.
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Failure reason, only set once the job failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Mean OCR confidence, set once processing completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_conf_mean: Option<f64>,
}

/// Full job record returned by `GET /jobs/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub summary: JobSummary,
    #[serde(default)]
    pub preview_ready: bool,
    #[serde(default)]
    pub csv_ready: bool,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
}

impl JobDetail {
    pub fn job_id(&self) -> &str {
        &self.summary.job_id
    }

    pub fn status(&self) -> &JobStatus {
        &self.summary.status
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JobListEnvelope {
    pub jobs: Vec<JobSummary>,
}

/// Response of a successful upload. The service returns the whole job record;
/// only the identifier is relied on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobCreated {
    pub job_id: String,
}

/// Outcome of one validated field in a preview row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub field: String,
    /// `"ok"` or any other string, which is treated as a warning.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRow {
    /// Display values, aligned with the payload headers.
    pub columns: Vec<String>,
    #[serde(default)]
    pub validations: Vec<ValidationResult>,
}

/// Tabular preview of the extracted data of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewPayload {
    #[serde(default)]
    pub job_id: String,
    pub headers: Vec<String>,
    pub rows: Vec<PreviewRow>,
    /// May exceed `rows.len()` when the preview is truncated.
    pub total_rows: u64,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalRequest {
    pub approver: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApprovalReceipt {
    pub job_id: String,
    pub approved: bool,
    #[serde(default)]
    pub approved_at: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One entry of the model registry history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_name: String,
    pub version: String,
    pub created_at: String,
    pub status: String,
    #[serde(default)]
    pub metrics: Metadata,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ModelHistoryEnvelope {
    pub items: Vec<ModelMetadata>,
}

/// Reference record used by the extraction pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterRecord {
    pub sigla: String,
    pub descricao: String,
    pub codigo: String,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MasterDataEnvelope {
    pub records: Vec<MasterRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
