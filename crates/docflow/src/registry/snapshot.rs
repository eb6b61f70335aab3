use std::collections::HashMap;

use serde::Serialize;

use crate::api::{JobStatus, JobSummary};

/// Immutable view of the job list at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrySnapshot {
    jobs: Vec<JobSummary>,
    index: HashMap<String, usize>,
}

/// Counters shown on the upload page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySummary {
    pub total: usize,
    pub processing: usize,
    pub awaiting_approval: usize,
    pub approved: usize,
    pub failed: usize,
}

impl RegistrySnapshot {
    /// Builds a snapshot from a job list, keeping service order.
    ///
    /// Repeated ids collapse into one entry at the first position, holding
    /// the record with the latest `updated_at`.
    pub fn from_jobs(jobs: Vec<JobSummary>) -> Self {
        let mut ordered: Vec<JobSummary> = Vec::with_capacity(jobs.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(jobs.len());

        for job in jobs {
            if job.updated_at < job.created_at {
                log::warn!(
                    "Job {} reports updated_at {} before created_at {}",
                    job.job_id,
                    job.updated_at,
                    job.created_at
                );
            }

            match index.get(&job.job_id) {
                Some(&pos) => {
                    log::debug!("Duplicate job id {} in job list", job.job_id);
                    if job.updated_at > ordered[pos].updated_at {
                        ordered[pos] = job;
                    }
                }
                None => {
                    index.insert(job.job_id.clone(), ordered.len());
                    ordered.push(job);
                }
            }
        }

        Self {
            jobs: ordered,
            index,
        }
    }

    /// Jobs in the order the service returned them.
    pub fn jobs(&self) -> &[JobSummary] {
        &self.jobs
    }

    pub fn get(&self, job_id: &str) -> Option<&JobSummary> {
        self.index.get(job_id).map(|&pos| &self.jobs[pos])
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.index.contains_key(job_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn filter_by_status<'a>(
        &'a self,
        status: &'a JobStatus,
    ) -> impl Iterator<Item = &'a JobSummary> + 'a {
        self.jobs.iter().filter(move |job| &job.status == status)
    }

    pub fn count_by_status(&self, status: &JobStatus) -> usize {
        self.filter_by_status(status).count()
    }

    /// Most recently updated first; ties broken by id so the order is stable
    /// across refreshes.
    pub fn recent_first(&self) -> Vec<&JobSummary> {
        let mut jobs: Vec<&JobSummary> = self.jobs.iter().collect();
        jobs.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        jobs
    }

    pub fn summary(&self) -> RegistrySummary {
        let mut summary = RegistrySummary {
            total: self.jobs.len(),
            ..RegistrySummary::default()
        };
        for job in &self.jobs {
            match job.status {
                JobStatus::Processing => summary.processing += 1,
                JobStatus::Completed => summary.awaiting_approval += 1,
                JobStatus::Approved => summary.approved += 1,
                JobStatus::Failed => summary.failed += 1,
                _ => {}
            }
        }
        summary
    }
}
