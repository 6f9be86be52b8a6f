//! In-memory job ledger
//!
//! Generic registry of asynchronous units of work with status, progress,
//! result/error and timestamps. Shared between the HTTP API (submission,
//! polling, deletion) and the background staging and sweep tasks, so all
//! mutation happens behind an async `RwLock` with short critical sections;
//! reads hand out cloned snapshots. Every mutation emits a `JobEvent` on a
//! broadcast channel for the SSE status stream.
//!
//! State machine: `pending → processing → {completed, failed}`. Updates to
//! a terminal job are rejected to preserve the invariant.

use mixdown_common::events::JobEvent;
use mixdown_common::{time, Error, Job, JobStatus, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Partial update merged into a job by [`JobLedger::update`]
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// Optional filters for [`JobLedger::list`]
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub job_type: Option<String>,
    pub status: Option<JobStatus>,
}

/// Shared in-memory job registry
pub struct JobLedger {
    jobs: RwLock<HashMap<Uuid, Job>>,
    event_tx: broadcast::Sender<JobEvent>,
}

impl JobLedger {
    /// Create an empty ledger with the given event buffer capacity
    pub fn new(event_capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(event_capacity);
        Self {
            jobs: RwLock::new(HashMap::new()),
            event_tx,
        }
    }

    /// Subscribe to job lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    /// Broadcast an event to all listeners
    fn broadcast(&self, event: JobEvent) {
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Register a new job: unique id, status pending, progress 0
    pub async fn create(&self, job_type: &str, metadata: serde_json::Value) -> Job {
        let now = time::now();
        let job = Job {
            id: Uuid::new_v4(),
            job_type: job_type.to_string(),
            status: JobStatus::Pending,
            progress: 0,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            metadata,
        };

        self.jobs.write().await.insert(job.id, job.clone());
        debug!("Created {} job {}", job.job_type, job.id);
        self.broadcast(JobEvent::Created {
            job: job.clone(),
            timestamp: now,
        });
        job
    }

    /// Snapshot of a job by id
    pub async fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// Number of jobs currently in the ledger
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Number of jobs of a type in a given status
    pub async fn count_by_status(&self, job_type: &str, status: JobStatus) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|j| j.job_type == job_type && j.status == status)
            .count()
    }

    /// Merge the provided fields into a job and bump its update timestamp
    ///
    /// Emits a progress event when only progress changed, a
    /// completed/failed event when the status became terminal, and a
    /// generic update event otherwise. Rejected for jobs already in a
    /// terminal state.
    pub async fn update(&self, id: Uuid, update: JobUpdate) -> Result<Job> {
        let progress_only = update.status.is_none()
            && update.result.is_none()
            && update.error.is_none()
            && update.progress.is_some();

        let snapshot = {
            let mut jobs = self.jobs.write().await;
            let job = jobs
                .get_mut(&id)
                .ok_or_else(|| Error::NotFound(format!("job {}", id)))?;

            if job.status.is_terminal() {
                return Err(Error::InvalidInput(format!(
                    "job {} is {}; updates to a terminal job are rejected",
                    id, job.status
                )));
            }

            if let Some(status) = update.status {
                job.status = status;
            }
            if let Some(progress) = update.progress {
                job.progress = progress.min(100);
            }
            if let Some(result) = update.result {
                job.result = Some(result);
            }
            if let Some(error) = update.error {
                job.error = Some(error);
            }
            job.updated_at = time::now();
            job.clone()
        };

        let timestamp = snapshot.updated_at;
        match snapshot.status {
            JobStatus::Completed => self.broadcast(JobEvent::Completed {
                job_id: snapshot.id,
                result: snapshot.result.clone().unwrap_or(serde_json::Value::Null),
                timestamp,
            }),
            JobStatus::Failed => self.broadcast(JobEvent::Failed {
                job_id: snapshot.id,
                error: snapshot.error.clone().unwrap_or_default(),
                timestamp,
            }),
            _ if progress_only => self.broadcast(JobEvent::Progress {
                job_id: snapshot.id,
                progress: snapshot.progress,
                timestamp,
            }),
            _ => self.broadcast(JobEvent::Updated {
                job: snapshot.clone(),
                timestamp,
            }),
        }

        Ok(snapshot)
    }

    /// Record progress, clamped to 0–100, forcing status to processing
    pub async fn set_progress(&self, id: Uuid, progress: u8) -> Result<Job> {
        let snapshot = {
            let mut jobs = self.jobs.write().await;
            let job = jobs
                .get_mut(&id)
                .ok_or_else(|| Error::NotFound(format!("job {}", id)))?;

            if job.status.is_terminal() {
                return Err(Error::InvalidInput(format!(
                    "job {} is {}; updates to a terminal job are rejected",
                    id, job.status
                )));
            }

            job.status = JobStatus::Processing;
            job.progress = progress.min(100);
            job.updated_at = time::now();
            job.clone()
        };

        self.broadcast(JobEvent::Progress {
            job_id: snapshot.id,
            progress: snapshot.progress,
            timestamp: snapshot.updated_at,
        });
        Ok(snapshot)
    }

    /// Terminal transition: completed with a result, progress forced to 100
    pub async fn complete(&self, id: Uuid, result: serde_json::Value) -> Result<Job> {
        self.update(
            id,
            JobUpdate {
                status: Some(JobStatus::Completed),
                progress: Some(100),
                result: Some(result),
                ..JobUpdate::default()
            },
        )
        .await
    }

    /// Terminal transition: failed with a message; partial progress retained
    pub async fn fail(&self, id: Uuid, error: impl Into<String>) -> Result<Job> {
        self.update(
            id,
            JobUpdate {
                status: Some(JobStatus::Failed),
                error: Some(error.into()),
                ..JobUpdate::default()
            },
        )
        .await
    }

    /// Remove a job unconditionally; false if it was not present
    pub async fn delete(&self, id: Uuid) -> bool {
        let removed = self.jobs.write().await.remove(&id).is_some();
        if removed {
            debug!("Deleted job {}", id);
            self.broadcast(JobEvent::Deleted {
                job_id: id,
                timestamp: time::now(),
            });
        }
        removed
    }

    /// List jobs newest-first, optionally filtered by type and/or status
    pub async fn list(&self, filter: &JobFilter) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|j| {
                filter
                    .job_type
                    .as_ref()
                    .map_or(true, |t| &j.job_type == t)
                    && filter.status.map_or(true, |s| j.status == s)
            })
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    /// Delete jobs that have been terminal for longer than the retention
    /// window; returns how many were reclaimed
    pub async fn sweep_once(&self, retention: Duration) -> usize {
        let cutoff = time::now()
            - chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::zero());

        let expired: Vec<Uuid> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|j| j.status.is_terminal() && j.updated_at < cutoff)
            .map(|j| j.id)
            .collect();

        let mut reclaimed = 0;
        for id in expired {
            if self.delete(id).await {
                reclaimed += 1;
            }
        }
        if reclaimed > 0 {
            info!("Sweep reclaimed {} expired job(s)", reclaimed);
        }
        reclaimed
    }

    /// Spawn the background sweep loop, bounding memory growth of the ledger
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        sweep_interval: Duration,
        retention: Duration,
    ) -> JoinHandle<()> {
        let ledger = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            // First tick fires immediately; skip it so a fresh ledger is not swept at startup
            ticker.tick().await;
            loop {
                ticker.tick().await;
                ledger.sweep_once(retention).await;
            }
        })
    }
}
