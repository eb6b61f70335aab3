//! Client-side model of a job's lifecycle.
//!
//! The service owns the status; the client only layers a transient
//! `Uploading` state on top while a create call is in flight. `Approved` and
//! `Failed` are never produced locally.

use serde::Serialize;

use crate::api::JobStatus;
use crate::error::ApiError;

/// Displayed state of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    /// Upload submitted, the service has not confirmed the job yet.
    Uploading { filename: String },
    /// Status as last reported by the service.
    Confirmed { status: JobStatus },
}

/// User actions a job view may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobAction {
    Approve,
    Download,
}

impl JobState {
    pub fn uploading(filename: impl Into<String>) -> Self {
        JobState::Uploading {
            filename: filename.into(),
        }
    }

    pub fn confirmed(status: JobStatus) -> Self {
        JobState::Confirmed { status }
    }

    /// Replaces the local placeholder (or a previous status) with the
    /// service's answer.
    pub fn confirm(self, status: JobStatus) -> Self {
        if let JobState::Confirmed { status: previous } = &self {
            if is_backward_transition(previous, &status) {
                log::debug!("Job status moved back from {} to {}", previous, status);
            }
        }
        JobState::Confirmed { status }
    }

    pub fn status(&self) -> Option<&JobStatus> {
        match self {
            JobState::Uploading { .. } => None,
            JobState::Confirmed { status } => Some(status),
        }
    }

    pub fn is_pending_upload(&self) -> bool {
        matches!(self, JobState::Uploading { .. })
    }

    /// True while no outcome is known yet.
    pub fn is_in_flight(&self) -> bool {
        match self {
            JobState::Uploading { .. } => true,
            JobState::Confirmed { status } => matches!(
                status,
                JobStatus::Received | JobStatus::Queued | JobStatus::Processing
            ),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Confirmed {
                status: JobStatus::Approved | JobStatus::Failed
            }
        )
    }

    pub fn can_approve(&self) -> bool {
        matches!(
            self,
            JobState::Confirmed {
                status: JobStatus::Completed
            }
        )
    }

    /// Rejects an approval attempt before any request is sent.
    ///
    /// The service stays authoritative: passing this check does not mean the
    /// approval will be accepted.
    pub fn ensure_approvable(&self) -> Result<(), ApiError> {
        if self.can_approve() {
            return Ok(());
        }
        let current = match self {
            JobState::Uploading { .. } => "uploading",
            JobState::Confirmed { status } => status.as_str(),
        };
        Err(ApiError::InvalidState(format!(
            "approval requires status 'completed', job is '{}'",
            current
        )))
    }

    /// Actions to offer for this state.
    ///
    /// `output_ready` says whether the structured output can be downloaded.
    pub fn available_actions(&self, output_ready: bool) -> Vec<JobAction> {
        let mut actions = Vec::new();
        if self.can_approve() {
            actions.push(JobAction::Approve);
        }
        let downloadable = matches!(
            self,
            JobState::Confirmed {
                status: JobStatus::Completed | JobStatus::Approved
            }
        );
        if output_ready && downloadable {
            actions.push(JobAction::Download);
        }
        actions
    }
}

/// Position of a status along the pipeline. Unknown statuses have none.
fn stage(status: &JobStatus) -> Option<u8> {
    match status {
        JobStatus::Received => Some(0),
        JobStatus::Queued => Some(1),
        JobStatus::Processing => Some(2),
        JobStatus::Completed | JobStatus::Failed => Some(3),
        JobStatus::Approved => Some(4),
        JobStatus::Unknown(_) => None,
    }
}

/// True when `next` lies earlier in the pipeline than `previous`.
///
/// Only used for diagnostics; the service's answer is always accepted.
pub fn is_backward_transition(previous: &JobStatus, next: &JobStatus) -> bool {
    match (stage(previous), stage(next)) {
        (Some(a), Some(b)) => b < a,
        _ => false,
    }
}
