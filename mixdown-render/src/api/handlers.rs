//! HTTP request handlers
//!
//! Implements the preview/job REST endpoints. Validation and not-found
//! failures are handled here at the boundary; render-stage failures never
//! surface through these handlers - they land in the job's terminal state
//! and are reported through polling.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use super::AppState;
use crate::ledger::JobFilter;
use crate::orchestrator::PreviewRequest;
use crate::render::{AudioFormat, ResultDescriptor};
use mixdown_common::{Error, Job, JobStatus};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPreviewResponse {
    success: bool,
    job_id: Uuid,
    estimated_time: f64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    success: bool,
    error: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    success: bool,
    job: Job,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    success: bool,
    jobs: Vec<Job>,
}

/// 400 body for an artifact requested before the job completed
#[derive(Debug, Serialize)]
pub struct NotReadyResponse {
    success: bool,
    status: JobStatus,
    progress: u8,
    error: String,
}

#[derive(Debug, Serialize)]
pub struct ArtifactUrlResponse {
    success: bool,
    url: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    success: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    #[serde(rename = "type")]
    job_type: Option<String>,
    status: Option<JobStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ArtifactQuery {
    format: Option<AudioFormat>,
}

// ============================================================================
// Preview Submission
// ============================================================================

/// POST /api/v1/preview - validate a session and admit a render job
///
/// Returns 200 with the job id and a completion estimate immediately; the
/// render itself runs in the background and is observed by polling.
pub async fn submit_preview(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<SubmitPreviewResponse>, (StatusCode, Json<ErrorResponse>)> {
    // Parse manually so malformed bodies yield a 400 with a useful message
    let request: PreviewRequest = serde_json::from_value(body).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(format!("malformed request: {}", e))),
        )
    })?;

    match state.orchestrator.start_preview(request).await {
        Ok(accepted) => Ok(Json(SubmitPreviewResponse {
            success: true,
            job_id: accepted.job_id,
            estimated_time: accepted.estimated_seconds,
        })),
        Err(Error::InvalidInput(message)) => {
            info!("Preview request rejected: {}", message);
            Err((StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))))
        }
        Err(e) => {
            error!("Preview submission failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string())),
            ))
        }
    }
}

// ============================================================================
// Job Polling and Management
// ============================================================================

/// GET /api/v1/jobs/:job_id - poll one job
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.ledger.get(job_id).await {
        Some(job) => Ok(Json(JobResponse { success: true, job })),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("job {} not found", job_id))),
        )),
    }
}

/// GET /api/v1/jobs - list jobs newest-first, optionally filtered
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Json<JobListResponse> {
    let jobs = state
        .ledger
        .list(&JobFilter {
            job_type: query.job_type,
            status: query.status,
        })
        .await;
    Json(JobListResponse {
        success: true,
        jobs,
    })
}

/// DELETE /api/v1/jobs/:job_id - remove a job, cancelling in-flight work
pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, (StatusCode, Json<ErrorResponse>)> {
    if state.orchestrator.delete_job(job_id).await {
        info!("Deleted job {}", job_id);
        Ok(Json(DeleteResponse { success: true }))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("job {} not found", job_id))),
        ))
    }
}

// ============================================================================
// Artifact Retrieval
// ============================================================================

/// GET /api/v1/preview/:job_id/artifact - fetch the rendered preview
///
/// Streams the artifact file when the job completed with a local path,
/// returns the URL as JSON when only an external location was recorded,
/// and answers 400 with current status/progress while the render is still
/// in flight.
pub async fn get_artifact(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(query): Query<ArtifactQuery>,
) -> Response {
    let Some(job) = state.ledger.get(job_id).await else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("job {} not found", job_id))),
        )
            .into_response();
    };

    if job.status != JobStatus::Completed {
        return (
            StatusCode::BAD_REQUEST,
            Json(NotReadyResponse {
                success: false,
                status: job.status,
                progress: job.progress,
                error: "render not complete".to_string(),
            }),
        )
            .into_response();
    }

    let descriptor: Option<ResultDescriptor> = job
        .result
        .and_then(|value| serde_json::from_value(value).ok());
    let Some(descriptor) = descriptor else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!(
                "no artifact recorded for job {}",
                job_id
            ))),
        )
            .into_response();
    };

    if let Some(path) = &descriptor.artifact_path {
        let format = query.format.unwrap_or(descriptor.format);
        return match tokio::fs::read(path).await {
            Ok(bytes) => (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, format.content_type().to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!(
                            "attachment; filename=\"mix-preview-{}.{}\"",
                            job_id,
                            format.extension()
                        ),
                    ),
                ],
                bytes,
            )
                .into_response(),
            Err(e) => {
                error!("Artifact for job {} unreadable at {}: {}", job_id, path, e);
                (
                    StatusCode::NOT_FOUND,
                    Json(ErrorResponse::new(format!(
                        "artifact for job {} is no longer available",
                        job_id
                    ))),
                )
                    .into_response()
            }
        };
    }

    if let Some(url) = descriptor.artifact_url {
        return Json(ArtifactUrlResponse { success: true, url }).into_response();
    }

    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(format!(
            "no artifact recorded for job {}",
            job_id
        ))),
    )
        .into_response()
}
