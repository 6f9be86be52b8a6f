//! Asynchronous job types
//!
//! A `Job` is a tracked unit of asynchronous render work. Jobs are created
//! and mutated by the render orchestrator through the job ledger and
//! polled by API clients until they reach a terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job lifecycle status
///
/// State machine: `pending → processing → {completed, failed}`. The two
/// terminal states admit no further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed and failed jobs accept no further updates
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A tracked unit of asynchronous work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    /// Job type tag, e.g. "mix-preview"
    #[serde(rename = "type")]
    pub job_type: String,
    pub status: JobStatus,
    /// Completion percentage, 0–100
    pub progress: u8,
    /// Result payload, set when the job completes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Failure message, set when the job fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Free-form metadata recorded at creation (session id, track count, ...)
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminality() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&JobStatus::Pending).unwrap(), "\"pending\"");
        assert_eq!(serde_json::to_string(&JobStatus::Failed).unwrap(), "\"failed\"");
    }

    #[test]
    fn test_job_wire_format() {
        let job = Job {
            id: Uuid::nil(),
            job_type: "mix-preview".to_string(),
            status: JobStatus::Processing,
            progress: 40,
            result: None,
            error: None,
            created_at: crate::time::now(),
            updated_at: crate::time::now(),
            metadata: serde_json::json!({"sessionId": "s-1"}),
        };

        let json = serde_json::to_string(&job).expect("job should serialize");
        assert!(json.contains("\"type\":\"mix-preview\""));
        assert!(json.contains("\"status\":\"processing\""));
        assert!(json.contains("\"createdAt\":"));
        assert!(!json.contains("\"result\":"), "unset result is omitted");
    }
}
