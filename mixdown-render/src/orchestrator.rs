//! Render orchestrator
//!
//! Validates a preview request, resolves the mix plan, registers a job in
//! the ledger and drives it through the staged render pipeline against the
//! render engine. `start_preview` returns as soon as the job exists; the
//! staging loop runs as an independent task admitted through a bounded
//! worker pool, never holds a ledger lock across a renderer call, and
//! recovers every stage failure into the job's terminal state.

use crate::ledger::JobLedger;
use crate::render::{
    AudioFormat, RenderContext, RenderQuality, RenderStage, Renderer, ResultDescriptor,
};
use crate::resolver;
use mixdown_common::model::{
    Session, MAX_CLIP_GAIN_DB, MAX_PAN, MAX_TEMPO_BPM, MIN_CLIP_GAIN_DB, MIN_PAN, MIN_TEMPO_BPM,
};
use mixdown_common::{Error, JobStatus, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Job type tag for preview renders
pub const MIX_PREVIEW_JOB_TYPE: &str = "mix-preview";

/// Progress reported once a job is admitted to a worker slot
const ADMITTED_PROGRESS: u8 = 5;

/// A request to render a session preview
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub session: Session,
    pub render_quality: RenderQuality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<AudioFormat>,
}

/// Immediate response to a successfully admitted preview request
#[derive(Debug, Clone, Copy)]
pub struct PreviewAccepted {
    pub job_id: Uuid,
    /// Caller-facing completion hint in seconds, not a deadline
    pub estimated_seconds: f64,
}

/// Drives preview render jobs from validation to a terminal state
pub struct RenderOrchestrator {
    ledger: Arc<JobLedger>,
    renderer: Arc<dyn Renderer>,
    worker_slots: Arc<Semaphore>,
    handles: Mutex<HashMap<Uuid, JoinHandle<()>>>,
    stage_timeout: Duration,
}

impl RenderOrchestrator {
    pub fn new(
        ledger: Arc<JobLedger>,
        renderer: Arc<dyn Renderer>,
        max_concurrent_renders: usize,
        stage_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            renderer,
            worker_slots: Arc::new(Semaphore::new(max_concurrent_renders.max(1))),
            handles: Mutex::new(HashMap::new()),
            stage_timeout,
        }
    }

    /// Validate, resolve and admit a preview render
    ///
    /// Returns without blocking on the render: on success the job exists in
    /// the ledger and its staging task is spawned (queuing for a worker
    /// slot if the pool is busy). Validation failures reject the request
    /// before any job is created, with every violation aggregated into one
    /// message.
    pub async fn start_preview(self: &Arc<Self>, request: PreviewRequest) -> Result<PreviewAccepted> {
        validate_request(&request)?;

        let plan = resolver::resolve(&request.session);
        let format = request.format.unwrap_or_default();
        let queued = self
            .ledger
            .count_by_status(MIX_PREVIEW_JOB_TYPE, JobStatus::Pending)
            .await;

        let render_duration = crate::render::trimmed_duration(
            plan.total_duration,
            request.start_time,
            request.end_time,
        );
        let estimated_seconds =
            estimate_render_seconds(render_duration, request.render_quality, queued);

        let job = self
            .ledger
            .create(
                MIX_PREVIEW_JOB_TYPE,
                json!({
                    "sessionId": plan.session_id,
                    "quality": request.render_quality,
                    "trackCount": plan.active_tracks.len(),
                    "duration": render_duration,
                    "format": format,
                }),
            )
            .await;

        info!(
            "Admitted preview job {} for session {} ({} active track(s), {:.2}s, estimate {:.2}s)",
            job.id,
            plan.session_id,
            plan.active_tracks.len(),
            render_duration,
            estimated_seconds
        );

        let ctx = RenderContext {
            job_id: job.id,
            plan,
            quality: request.render_quality,
            format,
            start_time: request.start_time,
            end_time: request.end_time,
        };

        // Hold the handle map across the spawn so the task's own cleanup
        // cannot race the insert.
        let mut handles = self.handles.lock().await;
        let orchestrator = Arc::clone(self);
        let job_id = job.id;
        let handle = tokio::spawn(async move {
            orchestrator.run_stages(ctx).await;
            orchestrator.handles.lock().await.remove(&job_id);
        });
        handles.insert(job_id, handle);
        drop(handles);

        Ok(PreviewAccepted {
            job_id,
            estimated_seconds,
        })
    }

    /// Delete a job, aborting its staging task if still running or queued
    pub async fn delete_job(&self, id: Uuid) -> bool {
        if let Some(handle) = self.handles.lock().await.remove(&id) {
            handle.abort();
            debug!("Aborted staging task for job {}", id);
        }
        self.ledger.delete(id).await
    }

    /// Staging loop for one job: worker-slot admission, then the fixed
    /// stage sequence with per-stage timeout. All failures terminate in
    /// the job's `failed` state; none escape.
    async fn run_stages(&self, ctx: RenderContext) {
        let job_id = ctx.job_id;

        let _permit = match Arc::clone(&self.worker_slots).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                let _ = self.ledger.fail(job_id, "worker pool shut down").await;
                return;
            }
        };

        if self.ledger.set_progress(job_id, ADMITTED_PROGRESS).await.is_err() {
            // Deleted (or finalized elsewhere) while waiting for a slot
            debug!("Job {} gone before staging started", job_id);
            return;
        }

        let mut artifact = None;
        for stage in RenderStage::ALL {
            match tokio::time::timeout(self.stage_timeout, self.renderer.run_stage(stage, &ctx))
                .await
            {
                Err(_) => {
                    warn!("Job {}: stage '{}' timed out", job_id, stage);
                    let _ = self
                        .ledger
                        .fail(
                            job_id,
                            format!(
                                "render stage '{}' timed out after {}s",
                                stage,
                                self.stage_timeout.as_secs()
                            ),
                        )
                        .await;
                    return;
                }
                Ok(Err(e)) => {
                    warn!("Job {}: stage '{}' failed: {}", job_id, stage, e);
                    let _ = self.ledger.fail(job_id, e.to_string()).await;
                    return;
                }
                Ok(Ok(output)) => {
                    if let Some(a) = output {
                        artifact = Some(a);
                    }
                    if stage != RenderStage::Encoding
                        && self.ledger.set_progress(job_id, stage.progress()).await.is_err()
                    {
                        debug!("Job {} gone mid-render; stopping staging", job_id);
                        return;
                    }
                }
            }
        }

        let Some(artifact) = artifact else {
            let _ = self
                .ledger
                .fail(job_id, "render engine produced no artifact")
                .await;
            return;
        };

        let descriptor =
            ResultDescriptor::new(artifact, ctx.effective_duration(), ctx.format);
        match serde_json::to_value(&descriptor) {
            Ok(result) => {
                if let Err(e) = self.ledger.complete(job_id, result).await {
                    debug!("Job {} could not be finalized: {}", job_id, e);
                } else {
                    info!("Job {} completed ({:.2}s rendered)", job_id, descriptor.duration);
                }
            }
            Err(e) => {
                let _ = self
                    .ledger
                    .fail(job_id, format!("result serialization failed: {}", e))
                    .await;
            }
        }
    }
}

/// Completion estimate: render factor times duration, scaled by the number
/// of jobs already waiting for a worker slot
fn estimate_render_seconds(duration: f64, quality: RenderQuality, queued_ahead: usize) -> f64 {
    duration * quality.time_factor() * (queued_ahead as f64 + 1.0)
}

/// Check every request invariant, collecting all violations into one error
fn validate_request(request: &PreviewRequest) -> Result<()> {
    let mut violations = Vec::new();
    let session = &request.session;

    if session.id.trim().is_empty() {
        violations.push("session id must not be empty".to_string());
    }
    if !(MIN_TEMPO_BPM..=MAX_TEMPO_BPM).contains(&session.tempo) {
        violations.push(format!(
            "session BPM {} outside supported range {}-{}",
            session.tempo, MIN_TEMPO_BPM, MAX_TEMPO_BPM
        ));
    }
    if session.tracks.is_empty() {
        violations.push("session must contain at least one track".to_string());
    }

    for track in &session.tracks {
        if track.regions.is_empty() {
            violations.push(format!("track '{}' has no regions", track.id));
        }
        if !(MIN_PAN..=MAX_PAN).contains(&track.pan) {
            violations.push(format!(
                "track '{}' pan {} outside range {}..{}",
                track.id, track.pan, MIN_PAN, MAX_PAN
            ));
        }
        for (index, region) in track.regions.iter().enumerate() {
            if region.source.trim().is_empty() {
                violations.push(format!(
                    "track '{}' region {}: source must not be empty",
                    track.id, index
                ));
            }
            if region.start < 0.0 {
                violations.push(format!(
                    "track '{}' region {}: start {} must not be negative",
                    track.id, index, region.start
                ));
            }
            if region.end <= region.start {
                violations.push(format!(
                    "track '{}' region {}: end {} must be greater than start {}",
                    track.id, index, region.end, region.start
                ));
            }
            if let Some(gain) = region.gain_db {
                if !(MIN_CLIP_GAIN_DB..=MAX_CLIP_GAIN_DB).contains(&gain) {
                    violations.push(format!(
                        "track '{}' region {}: gain {} dB outside range {}..{}",
                        track.id, index, gain, MIN_CLIP_GAIN_DB, MAX_CLIP_GAIN_DB
                    ));
                }
            }
        }
    }

    if let Some(start) = request.start_time {
        if start < 0.0 {
            violations.push(format!("trim start {} must not be negative", start));
        }
    }
    if let (Some(start), Some(end)) = (request.start_time, request.end_time) {
        if end <= start {
            violations.push(format!(
                "trim end {} must be greater than trim start {}",
                end, start
            ));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidInput(violations.join("; ")))
    }
}
