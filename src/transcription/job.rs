// transcription/job.rs
//
// Wire types for the remote transcription job lifecycle.

use serde::{Deserialize, Serialize};

/// Service-assigned job state. `Completed` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

/// One poll response for a submitted job.
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusResponse {
    pub status: JobStatus,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A submitted transcription job as tracked by the controller.
#[derive(Debug, Clone)]
pub struct TranscriptionJob {
    pub id: String,
    pub status: JobStatus,
}

impl TranscriptionJob {
    pub fn submitted(id: String) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
        }
    }
}
