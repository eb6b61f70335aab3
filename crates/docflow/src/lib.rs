pub mod api;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod preview;
pub mod registry;
pub mod workflow;

pub use api::{HttpJobClient, JobApi, JobDetail, JobStatus, JobSummary, PreviewPayload};
pub use config::{load_config, ClientConfig};
pub use error::{ApiError, ConfigError, DocflowError, PreviewError, Result};
pub use lifecycle::{JobAction, JobState};
pub use logging::{init_logging, LogFormat};
pub use preview::{project, PreviewGrid, PreviewState, ValidationOutcome};
pub use registry::{JobRegistry, LoadState, RegistrySnapshot};
pub use workflow::{Orchestrator, Route, UploadFile, View};
