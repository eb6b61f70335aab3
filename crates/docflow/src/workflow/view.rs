use crate::api::{JobDetail, JobSummary, ModelMetadata};
use crate::error::ApiError;
use crate::lifecycle::{JobAction, JobState};
use crate::preview::PreviewState;
use crate::registry::{LoadState, RegistrySummary};

/// Where the operator can navigate to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Upload,
    Job(String),
    History,
}

/// What the operator sees after an action settles.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Upload(UploadView),
    Result(Box<ResultView>),
    /// The job view could not be built because the job itself could not be
    /// loaded. Nothing that depends on the job is offered.
    JobUnavailable { job_id: String, error: ApiError },
    History(HistoryView),
}

impl View {
    pub fn route(&self) -> Route {
        match self {
            View::Upload(_) => Route::Upload,
            View::Result(view) => Route::Job(view.job.job_id().to_string()),
            View::JobUnavailable { job_id, .. } => Route::Job(job_id.clone()),
            View::History(_) => Route::History,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadView {
    pub summary: RegistrySummary,
    pub jobs_state: LoadState,
    /// Error of the last submission, shown next to the drop zone.
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub job: JobDetail,
    pub state: JobState,
    pub preview: PreviewState,
    /// Error of the last action attempted from this view.
    pub action_error: Option<ApiError>,
}

impl ResultView {
    pub fn new(job: JobDetail, preview: PreviewState) -> Self {
        let state = JobState::confirmed(job.status().clone());
        Self {
            job,
            state,
            preview,
            action_error: None,
        }
    }

    /// Actions to enable. Download needs the service's CSV flag and a
    /// rendered preview.
    pub fn actions(&self) -> Vec<JobAction> {
        let output_ready = self.job.csv_ready && self.preview.is_ready();
        self.state.available_actions(output_ready)
    }

    pub fn can_approve(&self) -> bool {
        self.actions().contains(&JobAction::Approve)
    }

    pub(crate) fn with_action_error(mut self, error: ApiError) -> Self {
        self.action_error = Some(error);
        self
    }
}

/// A supplementary list that may fail to load on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum Section<T> {
    Loaded(T),
    Unavailable { reason: String },
}

impl<T> Section<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Section::Loaded(value) => Some(value),
            Section::Unavailable { .. } => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Section::Loaded(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryView {
    /// Approved jobs from the registry. On a failed refresh these are the
    /// entries of the last successful one.
    pub approved_jobs: Vec<JobSummary>,
    pub jobs_state: LoadState,
    pub models: Section<Vec<ModelMetadata>>,
}
