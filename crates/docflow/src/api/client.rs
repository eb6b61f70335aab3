//! HTTP implementation of [`JobApi`].

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::multipart;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::models::{
    ApprovalReceipt, ApprovalRequest, HealthStatus, JobCreated, JobDetail, JobListEnvelope,
    JobSummary, MasterDataEnvelope, MasterRecord, ModelHistoryEnvelope, ModelMetadata,
    PreviewPayload,
};
use super::{ApiResult, JobApi};
use crate::config::ClientConfig;
use crate::error::ApiError;

/// Maximum length for error bodies carried in error messages.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// How a 4xx rejection of a request should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rejection {
    /// The submitted input was refused (uploads).
    Validation,
    /// The action is not allowed for the resource's status (approvals).
    InvalidState,
    /// Plain reads: no special meaning beyond 404.
    Unclassified,
}

/// Maps a non-success HTTP status to the error taxonomy.
pub(crate) fn classify_status(status: StatusCode, body: &str, rejection: Rejection) -> ApiError {
    let detail = error_detail(body);

    if status == StatusCode::NOT_FOUND {
        return ApiError::NotFound(detail);
    }
    if status == StatusCode::CONFLICT {
        return ApiError::InvalidState(detail);
    }

    let is_rejection = matches!(
        status,
        StatusCode::BAD_REQUEST
            | StatusCode::PAYLOAD_TOO_LARGE
            | StatusCode::UNSUPPORTED_MEDIA_TYPE
            | StatusCode::UNPROCESSABLE_ENTITY
    );

    match (is_rejection, rejection) {
        (true, Rejection::Validation) => ApiError::Validation(detail),
        (true, Rejection::InvalidState) => ApiError::InvalidState(detail),
        _ => ApiError::Http {
            status: status.as_u16(),
            body: detail,
        },
    }
}

/// Extracts a human-readable message from an error body.
///
/// The job service answers errors with `{"detail": ...}`; anything else is
/// passed through, truncated.
fn error_detail(body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| match value.get("detail") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        })
        .unwrap_or_else(|| body.trim().to_string());

    truncate(&detail)
}

fn truncate(text: &str) -> String {
    if text.len() > MAX_ERROR_BODY_LENGTH {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated)", &text[..end])
    } else {
        text.to_string()
    }
}

fn transport_error(context: &str, err: reqwest::Error) -> ApiError {
    if err.is_decode() {
        ApiError::Decode(format!("{}: {}", context, err))
    } else {
        ApiError::Transport(format!("{}: {}", context, err))
    }
}

/// Creates an HTTP client with the configured connect timeout. Overall
/// request timeouts are set per call.
fn create_http_client(config: &ClientConfig) -> ApiResult<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout())
        .build()
        .map_err(|e| ApiError::Transport(format!("Failed to create HTTP client: {}", e)))
}

/// Job service client over HTTP.
#[derive(Clone)]
pub struct HttpJobClient {
    client: Client,
    base_url: Url,
    request_timeout: Duration,
    upload_timeout: Option<Duration>,
}

impl HttpJobClient {
    /// Creates a client bound to the configured base URL.
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!(
                "{} cannot be used as a base URL",
                config.base_url
            )));
        }

        Ok(Self {
            client: create_http_client(config)?,
            base_url,
            request_timeout: config.request_timeout(),
            upload_timeout: config.upload_timeout(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds `{base}/{segments...}`, percent-encoding each segment.
    ///
    /// An empty final segment yields a trailing slash (`/jobs/`).
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                ApiError::InvalidUrl(format!("{} cannot be used as a base URL", self.base_url))
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    async fn read_json<T: DeserializeOwned>(
        response: Response,
        context: &str,
        rejection: Rejection,
    ) -> ApiResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    debug!("{}: could not read error body: {}", context, e);
                    String::new()
                }
            };
            let err = classify_status(status, &body, rejection);
            debug!("{} failed ({}): {}", context, status, err);
            return Err(err);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(format!("{}: {}", context, e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str], context: &str) -> ApiResult<T> {
        let url = self.endpoint(segments)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| transport_error(context, e))?;

        Self::read_json(response, context, Rejection::Unclassified).await
    }
}

#[async_trait]
impl JobApi for HttpJobClient {
    async fn list_jobs(&self) -> ApiResult<Vec<JobSummary>> {
        let envelope: JobListEnvelope = self.get_json(&["jobs", ""], "List jobs").await?;
        debug!("Job service returned {} jobs", envelope.jobs.len());
        Ok(envelope.jobs)
    }

    async fn get_job(&self, job_id: &str) -> ApiResult<JobDetail> {
        self.get_json(&["jobs", job_id], "Get job").await
    }

    async fn create_job(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        uploader: Option<&str>,
    ) -> ApiResult<JobCreated> {
        let url = self.endpoint(&["jobs", ""])?;
        let mime = mime_guess::from_path(filename).first_or_octet_stream();
        let size = bytes.len();

        let part = multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime.as_ref())
            .map_err(|e| ApiError::Validation(format!("Invalid file type: {}", e)))?;

        let mut form = multipart::Form::new().part("file", part);
        if let Some(uploader) = uploader {
            form = form.text("uploader", uploader.to_string());
        }

        info!("Uploading '{}' ({} bytes, {})", filename, size, mime);

        let mut request = self.client.post(url).multipart(form);
        if let Some(timeout) = self.upload_timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .await
            .map_err(|e| transport_error("Create job", e))?;

        let created: JobCreated =
            Self::read_json(response, "Create job", Rejection::Validation).await?;
        info!("Job {} created for '{}'", created.job_id, filename);
        Ok(created)
    }

    async fn get_preview(&self, job_id: &str) -> ApiResult<PreviewPayload> {
        self.get_json(&["preview", job_id], "Get preview").await
    }

    async fn approve_job(
        &self,
        job_id: &str,
        approver: &str,
        notes: Option<&str>,
    ) -> ApiResult<ApprovalReceipt> {
        let url = self.endpoint(&["approval", job_id])?;
        let request = ApprovalRequest {
            approver: approver.to_string(),
            notes: notes.map(str::to_string),
        };

        let response = self
            .client
            .post(url)
            .json(&request)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| transport_error("Approve job", e))?;

        let receipt: ApprovalReceipt =
            Self::read_json(response, "Approve job", Rejection::InvalidState).await?;
        if !receipt.approved {
            warn!("Job service answered approval of {} without approving it", job_id);
            return Err(ApiError::InvalidState(format!(
                "job {} was not approved",
                job_id
            )));
        }

        info!("Job {} approved by {}", job_id, approver);
        Ok(receipt)
    }

    async fn list_model_history(&self) -> ApiResult<Vec<ModelMetadata>> {
        let envelope: ModelHistoryEnvelope =
            self.get_json(&["models", "history"], "List model history").await?;
        Ok(envelope.items)
    }

    async fn list_master_data(&self) -> ApiResult<Vec<MasterRecord>> {
        let envelope: MasterDataEnvelope =
            self.get_json(&["master-data", ""], "List master data").await?;
        Ok(envelope.records)
    }

    async fn health(&self) -> ApiResult<HealthStatus> {
        self.get_json(&["health"], "Health check").await
    }

    fn download_location(&self, job_id: &str) -> ApiResult<Url> {
        self.endpoint(&["download", job_id])
    }
}
