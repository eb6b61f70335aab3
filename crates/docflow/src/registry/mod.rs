//! Client-side registry of known jobs.
//!
//! The registry holds the result of the last successful job list fetch as an
//! `Arc<RegistrySnapshot>`. A refresh builds a complete new snapshot and swaps
//! it in with a single assignment, so readers always see either the old or the
//! new list, never a mix. A failed refresh keeps the old snapshot.

mod snapshot;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::{JobApi, JobStatus};
use crate::error::ApiError;
use crate::lifecycle::is_backward_transition;

pub use snapshot::{RegistrySnapshot, RegistrySummary};

/// Loading state of the registry, for views to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadState {
    /// No refresh has completed yet.
    Idle,
    /// The last completed refresh succeeded.
    Loaded { at: DateTime<Utc> },
    /// The last completed refresh failed; the snapshot is stale.
    Failed { message: String },
}

struct Inner {
    snapshot: Arc<RegistrySnapshot>,
    load_state: LoadState,
    /// Ticket of the refresh that produced the current state.
    applied_ticket: u64,
}

/// In-memory job registry.
pub struct JobRegistry {
    inner: RwLock<Inner>,
    next_ticket: AtomicU64,
    in_flight: AtomicUsize,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                snapshot: Arc::new(RegistrySnapshot::default()),
                load_state: LoadState::Idle,
                applied_ticket: 0,
            }),
            next_ticket: AtomicU64::new(1),
            in_flight: AtomicUsize::new(0),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        match self.inner.read() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        match self.inner.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Current snapshot. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.read().snapshot)
    }

    pub fn load_state(&self) -> LoadState {
        self.read().load_state.clone()
    }

    /// True while at least one refresh is outstanding.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    /// Re-fetches the job list and replaces the registry contents.
    ///
    /// On failure the current snapshot is left untouched and the error is
    /// recorded in [`LoadState::Failed`] as well as returned. When refreshes
    /// overlap, whichever resolves last determines the final contents.
    pub async fn refresh<A>(&self, api: &A) -> Result<Arc<RegistrySnapshot>, ApiError>
    where
        A: JobApi + ?Sized,
    {
        let ticket = self.next_ticket.fetch_add(1, Ordering::AcqRel);
        let result = {
            let _loading = InFlight::enter(&self.in_flight);
            api.list_jobs().await
        };

        match result {
            Ok(jobs) => {
                let fresh = Arc::new(RegistrySnapshot::from_jobs(jobs));
                self.apply(ticket, Arc::clone(&fresh));
                Ok(fresh)
            }
            Err(err) => {
                log::warn!("Job list refresh failed, keeping previous jobs: {}", err);
                self.record_failure(ticket, &err);
                Err(err)
            }
        }
    }

    fn apply(&self, ticket: u64, fresh: Arc<RegistrySnapshot>) {
        let mut inner = self.write();
        if ticket < inner.applied_ticket {
            log::debug!(
                "Refresh #{} resolved after #{}, its result replaces the newer one",
                ticket,
                inner.applied_ticket
            );
        }
        log_regressions(&inner.snapshot, &fresh);

        inner.snapshot = fresh;
        inner.load_state = LoadState::Loaded { at: Utc::now() };
        inner.applied_ticket = ticket;
    }

    fn record_failure(&self, ticket: u64, err: &ApiError) {
        let mut inner = self.write();
        inner.load_state = LoadState::Failed {
            message: err.to_string(),
        };
        inner.applied_ticket = ticket;
    }

    /// Convenience for views: counts on the current snapshot.
    pub fn count_by_status(&self) -> HashMap<JobStatus, usize> {
        let snapshot = self.snapshot();
        let mut counts = HashMap::new();
        for job in snapshot.jobs() {
            *counts.entry(job.status.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Counts one outstanding refresh; released on drop, so an abandoned
/// refresh does not leave the registry loading.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Logs jobs whose timestamp or status went backwards between snapshots.
fn log_regressions(previous: &RegistrySnapshot, fresh: &RegistrySnapshot) {
    for job in fresh.jobs() {
        if let Some(old) = previous.get(&job.job_id) {
            if job.updated_at < old.updated_at {
                log::debug!(
                    "Job {} updated_at went back from {} to {}",
                    job.job_id,
                    old.updated_at,
                    job.updated_at
                );
            }
            if is_backward_transition(&old.status, &job.status) {
                log::debug!(
                    "Job {} status went back from {} to {}",
                    job.job_id,
                    old.status,
                    job.status
                );
            }
        }
    }
}
