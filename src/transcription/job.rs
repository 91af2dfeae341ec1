use serde::{Deserialize, Serialize};

use super::TranscriptionOutput;

/// Lifecycle of a remote transcription job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Submitted,
    /// Waiting for a worker; usually a cold start
    InQueue,
    InProgress,
    Completed,
    Failed,
    /// The client stopped polling; the job may still be running remotely
    TimedOut,
}

impl JobStatus {
    /// Map a worker status string. Unrecognised states keep the job polling.
    pub fn from_worker(status: &str) -> Self {
        match status.trim().to_ascii_uppercase().as_str() {
            "IN_QUEUE" => JobStatus::InQueue,
            "IN_PROGRESS" => JobStatus::InProgress,
            "COMPLETED" => JobStatus::Completed,
            "FAILED" | "CANCELLED" | "TIMED_OUT" => JobStatus::Failed,
            _ => JobStatus::InProgress,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::TimedOut
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Submitted => "SUBMITTED",
            JobStatus::InQueue => "IN_QUEUE",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::TimedOut => "TIMED_OUT",
        }
    }

    /// Operator hint shown next to a status change
    pub fn hint(&self) -> &'static str {
        match self {
            JobStatus::InQueue => "(cold start, GPU worker booting)",
            JobStatus::InProgress => "(transcribing)",
            JobStatus::Completed => "(done)",
            _ => "",
        }
    }
}

/// Client-side view of one submitted job
#[derive(Debug, Clone)]
pub struct TranscriptionJob {
    pub id: String,
    pub status: JobStatus,
    /// Last status string exactly as the worker reported it
    pub raw_status: String,
    pub output: Option<TranscriptionOutput>,
    /// Status checks performed so far
    pub attempts: u32,
}

impl TranscriptionJob {
    pub fn submitted(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Submitted,
            raw_status: JobStatus::Submitted.as_str().to_string(),
            output: None,
            attempts: 0,
        }
    }

    /// Record a polled status; returns true when the worker's status string
    /// differs from the last one, even if both map to the same `JobStatus`
    pub fn observe(&mut self, status: JobStatus, raw_status: &str) -> bool {
        self.attempts += 1;
        let changed = self.raw_status != raw_status;
        self.status = status;
        if changed {
            self.raw_status = raw_status.to_string();
        }
        changed
    }

    pub fn time_out(&mut self) {
        self.status = JobStatus::TimedOut;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_status_mapping() {
        assert_eq!(JobStatus::from_worker("IN_QUEUE"), JobStatus::InQueue);
        assert_eq!(JobStatus::from_worker("in_progress"), JobStatus::InProgress);
        assert_eq!(JobStatus::from_worker("COMPLETED"), JobStatus::Completed);
        assert_eq!(JobStatus::from_worker("CANCELLED"), JobStatus::Failed);
        assert_eq!(JobStatus::from_worker("THROTTLED"), JobStatus::InProgress);
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::TimedOut.is_terminal());
        assert!(!JobStatus::InQueue.is_terminal());
        assert!(!JobStatus::Submitted.is_terminal());
    }

    #[test]
    fn test_observe_reports_changes_only() {
        let mut job = TranscriptionJob::submitted("job-1");

        assert!(job.observe(JobStatus::InQueue, "IN_QUEUE"));
        assert!(!job.observe(JobStatus::InQueue, "IN_QUEUE"));
        assert!(job.observe(JobStatus::InProgress, "IN_PROGRESS"));
        assert_eq!(job.attempts, 3);
    }

    #[test]
    fn test_unknown_status_transitions_are_changes() {
        let mut job = TranscriptionJob::submitted("job-1");

        assert!(job.observe(JobStatus::from_worker("THROTTLED"), "THROTTLED"));
        assert!(!job.observe(JobStatus::from_worker("THROTTLED"), "THROTTLED"));
        assert!(job.observe(JobStatus::from_worker("IN_PROGRESS"), "IN_PROGRESS"));
        assert_eq!(job.status, JobStatus::InProgress);
        assert_eq!(job.raw_status, "IN_PROGRESS");
    }
}
