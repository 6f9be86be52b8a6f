//! Event types for the job lifecycle notification system
//!
//! Every mutation of the job ledger emits one of these so live status
//! channels (SSE) can react without polling.

use crate::job::Job;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job lifecycle event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum JobEvent {
    /// A job was registered in the ledger
    Created {
        job: Job,
        timestamp: DateTime<Utc>,
    },

    /// A job's progress advanced
    Progress {
        job_id: Uuid,
        progress: u8,
        timestamp: DateTime<Utc>,
    },

    /// A job's fields changed without reaching a terminal state
    Updated {
        job: Job,
        timestamp: DateTime<Utc>,
    },

    /// A job finished successfully
    Completed {
        job_id: Uuid,
        result: serde_json::Value,
        timestamp: DateTime<Utc>,
    },

    /// A job failed
    Failed {
        job_id: Uuid,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// A job was removed from the ledger
    Deleted {
        job_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl JobEvent {
    /// Get event type as string for SSE event naming and filtering
    pub fn event_type(&self) -> &str {
        match self {
            JobEvent::Created { .. } => "Created",
            JobEvent::Progress { .. } => "Progress",
            JobEvent::Updated { .. } => "Updated",
            JobEvent::Completed { .. } => "Completed",
            JobEvent::Failed { .. } => "Failed",
            JobEvent::Deleted { .. } => "Deleted",
        }
    }

    /// Id of the job the event concerns
    pub fn job_id(&self) -> Uuid {
        match self {
            JobEvent::Created { job, .. } | JobEvent::Updated { job, .. } => job.id,
            JobEvent::Progress { job_id, .. }
            | JobEvent::Completed { job_id, .. }
            | JobEvent::Failed { job_id, .. }
            | JobEvent::Deleted { job_id, .. } => *job_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time;

    #[test]
    fn test_event_type_names() {
        let event = JobEvent::Deleted {
            job_id: Uuid::new_v4(),
            timestamp: time::now(),
        };
        assert_eq!(event.event_type(), "Deleted");
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let id = Uuid::new_v4();
        let event = JobEvent::Progress {
            job_id: id,
            progress: 60,
            timestamp: time::now(),
        };

        let json = serde_json::to_string(&event).expect("event should serialize");
        assert!(json.contains("\"type\":\"Progress\""));
        assert!(json.contains("\"progress\":60"));
        assert!(json.contains("\"jobId\":"));

        let back: JobEvent = serde_json::from_str(&json).expect("event should deserialize");
        assert_eq!(back.job_id(), id);
    }
}
